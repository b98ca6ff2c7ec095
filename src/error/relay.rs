use crate::upstream::UPSTREAM_BODY_PREVIEW_CHARS;
use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use groundchat_schema::{GeminiErrorBody, GeminiErrorObject};
use thiserror::Error as ThisError;

/// Failures the proxy reports itself. Upstream replies that decode as JSON are
/// never turned into a `RelayError`; they are relayed verbatim.
#[derive(Debug, ThisError)]
pub enum RelayError {
    /// The secret upstream key is not configured.
    #[error("API key is not configured")]
    MissingApiKey,

    #[error("Request rejected")]
    RequestRejected {
        status: StatusCode,
        body: GeminiErrorObject,
        debug_message: Option<String>,
    },

    /// Upstream kept answering with a body that is not JSON.
    #[error("Upstream body could not be decoded: status={status}, reason={reason}")]
    UpstreamUndecodable { status: StatusCode, reason: String },

    /// Upstream could not be reached at all.
    #[error("Upstream unreachable: {0}")]
    UpstreamUnreachable(String),
}

impl RelayError {
    pub(crate) fn bad_request(message: impl Into<String>) -> Self {
        RelayError::RequestRejected {
            status: StatusCode::BAD_REQUEST,
            body: error_object(StatusCode::BAD_REQUEST, "INVALID_ARGUMENT", message),
            debug_message: None,
        }
    }
}

fn error_object(
    status: StatusCode,
    canonical: &str,
    message: impl Into<String>,
) -> GeminiErrorObject {
    GeminiErrorObject::new(status.as_u16(), canonical, message)
}

impl From<JsonRejection> for RelayError {
    fn from(rejection: JsonRejection) -> Self {
        let debug_message = rejection.to_string();
        let message = match rejection {
            JsonRejection::JsonSyntaxError(_) => "invalid JSON",
            JsonRejection::MissingJsonContentType(_) => "expected application/json",
            _ => "invalid request",
        };
        RelayError::RequestRejected {
            status: StatusCode::BAD_REQUEST,
            body: error_object(StatusCode::BAD_REQUEST, "INVALID_ARGUMENT", message),
            debug_message: Some(debug_message),
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let (status, error_body) = match self {
            RelayError::MissingApiKey => {
                tracing::error!("Rejecting request: upstream API key is not configured");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    error_object(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "FAILED_PRECONDITION",
                        "API key is not configured on the server.",
                    ),
                )
            }

            RelayError::RequestRejected {
                status,
                body,
                debug_message,
            } => {
                if let Some(debug_message) = debug_message {
                    tracing::warn!(
                        status = %status,
                        message = %body.message,
                        debug_message = %debug_message,
                        "Request rejected"
                    );
                } else {
                    tracing::warn!(status = %status, message = %body.message, "Request rejected");
                }
                (status, body)
            }

            RelayError::UpstreamUndecodable { status, reason } => {
                tracing::warn!(
                    upstream_status = %status,
                    reason = %format!("{:.len$}", reason, len = UPSTREAM_BODY_PREVIEW_CHARS),
                    "Upstream body undecodable after retries"
                );
                (
                    StatusCode::BAD_GATEWAY,
                    error_object(
                        StatusCode::BAD_GATEWAY,
                        "UNAVAILABLE",
                        format!("Failed to decode upstream response: {reason}"),
                    ),
                )
            }

            RelayError::UpstreamUnreachable(reason) => {
                tracing::warn!(reason = %reason, "Upstream unreachable after retries");
                (
                    StatusCode::BAD_GATEWAY,
                    error_object(
                        StatusCode::BAD_GATEWAY,
                        "UNAVAILABLE",
                        format!("Upstream service unreachable: {reason}"),
                    ),
                )
            }
        };

        (status, Json(GeminiErrorBody::from(error_body))).into_response()
    }
}
