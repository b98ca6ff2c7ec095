use crate::error::RelayError;
use crate::server::router::RelayState;
use axum::{extract::FromRequestParts, http::request::Parts};
use std::sync::Arc;

/// Resolves the server's own upstream key before anything else about the
/// request is looked at. Handlers take it as their first extractor so a
/// misconfigured server answers the same way whatever the body contains.
#[derive(Debug, Clone)]
pub struct RequireApiKey(pub Arc<str>);

impl FromRequestParts<RelayState> for RequireApiKey {
    type Rejection = RelayError;

    async fn from_request_parts(
        _parts: &mut Parts,
        state: &RelayState,
    ) -> Result<Self, Self::Rejection> {
        state
            .api_key
            .clone()
            .map(RequireApiKey)
            .ok_or(RelayError::MissingApiKey)
    }
}
