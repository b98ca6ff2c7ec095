use crate::error::RelayError;
use crate::server::guards::api_key::RequireApiKey;
use crate::server::respond::relay_outcome;
use crate::server::router::RelayState;
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    response::Response,
};
use groundchat_schema::{ChatProxyRequest, GeminiGenerateContentRequest};
use serde_json::{Value, json};
use tracing::debug;

/// Existence check: succeeds only when the server holds an API key.
pub async fn chat_probe_handler(RequireApiKey(_): RequireApiKey) -> Json<Value> {
    Json(json!({"status": "ok"}))
}

/// Forwards the conversation to the text model with search grounding and the
/// configured system instruction, then relays the final reply.
pub async fn chat_handler(
    RequireApiKey(api_key): RequireApiKey,
    State(state): State<RelayState>,
    payload: Result<Json<ChatProxyRequest>, JsonRejection>,
) -> Result<Response, RelayError> {
    let Json(request) = payload?;
    debug!(turns = request.contents.len(), "Chat request accepted");

    let body = GeminiGenerateContentRequest::grounded_text(
        request.contents,
        &state.upstream.system_instruction,
    );
    let outcome = state
        .caller
        .post_with_retry(
            "chat",
            &state.retry,
            &state.upstream.text_url,
            &api_key,
            &body,
        )
        .await;

    Ok(relay_outcome(outcome))
}
