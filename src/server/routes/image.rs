use crate::error::RelayError;
use crate::server::guards::api_key::RequireApiKey;
use crate::server::respond::relay_outcome;
use crate::server::router::RelayState;
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    response::Response,
};
use groundchat_schema::{GeminiGenerateContentRequest, ImageProxyRequest};
use serde_json::{Value, json};

/// Existence check for the image endpoint.
pub async fn image_probe_handler(RequireApiKey(_): RequireApiKey) -> Json<Value> {
    Json(json!({"status": "ok"}))
}

pub async fn image_handler(
    RequireApiKey(api_key): RequireApiKey,
    State(state): State<RelayState>,
    payload: Result<Json<ImageProxyRequest>, JsonRejection>,
) -> Result<Response, RelayError> {
    let Json(request) = payload?;
    let prompt = request
        .prompt()
        .ok_or_else(|| RelayError::bad_request("Missing prompt"))?;

    let body = GeminiGenerateContentRequest::image_prompt(prompt);
    let outcome = state
        .caller
        .post_with_retry(
            "image",
            &state.retry,
            &state.upstream.image_url,
            &api_key,
            &body,
        )
        .await;

    Ok(relay_outcome(outcome))
}
