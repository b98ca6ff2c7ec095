//! Single-shot calls to the upstream generation API and the classification of
//! their outcomes.

mod caller;

pub use caller::{GROUNDCHAT_USER_AGENT, UpstreamCaller, exchange};

use axum::http::StatusCode;
use serde_json::Value;

pub const UPSTREAM_BODY_PREVIEW_CHARS: usize = 300;

/// Canonical upstream status for quota and rate exhaustion.
const RESOURCE_EXHAUSTED: &str = "RESOURCE_EXHAUSTED";

/// Message fragments that upstream uses for quota errors. Only consulted when
/// the structured `status` field does not already classify the error.
const QUOTA_MESSAGE_MARKERS: [&str; 2] = ["quota exceeded", "exceeded your current quota"];

/// Result of one HTTP exchange, with or without a decodable body.
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamOutcome {
    /// A response whose body decoded as JSON, any status.
    Reply { status: StatusCode, body: Value },
    /// A response arrived but its body was not JSON.
    Undecodable { status: StatusCode, reason: String },
    /// No response: connect, DNS, TLS or timeout failure.
    Unreachable { reason: String },
}

impl UpstreamOutcome {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            UpstreamOutcome::Reply { status, .. } | UpstreamOutcome::Undecodable { status, .. } => {
                Some(*status)
            }
            UpstreamOutcome::Unreachable { .. } => None,
        }
    }

    /// The decoded body of a 2xx reply.
    pub fn success_body(&self) -> Option<&Value> {
        match self {
            UpstreamOutcome::Reply { status, body } if status.is_success() => Some(body),
            _ => None,
        }
    }

    /// Whether another attempt could plausibly succeed: rate limiting, quota
    /// exhaustion, an undecodable body or a transport failure.
    pub fn is_retryable(&self) -> bool {
        match self {
            UpstreamOutcome::Reply { status, body } => {
                *status == StatusCode::TOO_MANY_REQUESTS || is_quota_exceeded(body)
            }
            UpstreamOutcome::Undecodable { .. } | UpstreamOutcome::Unreachable { .. } => true,
        }
    }
}

/// `error.message` of an upstream body, when it is a non-empty string. The
/// rest of the body may have any shape.
pub fn error_message(body: &Value) -> Option<&str> {
    body.pointer("/error/message")
        .and_then(Value::as_str)
        .filter(|message| !message.is_empty())
}

fn error_status(body: &Value) -> Option<&str> {
    body.pointer("/error/status").and_then(Value::as_str)
}

/// Quota detection: the structured status first, the message text second.
pub fn is_quota_exceeded(body: &Value) -> bool {
    if error_status(body) == Some(RESOURCE_EXHAUSTED) {
        return true;
    }
    error_message(body).is_some_and(|message| {
        let message = message.to_ascii_lowercase();
        QUOTA_MESSAGE_MARKERS
            .iter()
            .any(|marker| message.contains(marker))
    })
}

pub(crate) fn preview(raw: &str) -> String {
    format!("{:.len$}", raw, len = UPSTREAM_BODY_PREVIEW_CHARS)
}
