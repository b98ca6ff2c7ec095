use serde::Serialize;
use serde_json::Value;

/// Upstream-style error envelope: `{"error": {...}}`. The proxy renders its
/// own failures in this shape; upstream errors are relayed as raw JSON.
#[derive(Debug, Clone, Serialize)]
pub struct GeminiErrorBody {
    #[serde(rename = "error")]
    pub inner: GeminiErrorObject,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct GeminiErrorObject {
    pub code: u16,

    pub message: String,

    /// Canonical status string, e.g. `FAILED_PRECONDITION`.
    pub status: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl GeminiErrorObject {
    pub fn new(code: u16, status: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            status: status.into(),
            details: None,
        }
    }
}

impl From<GeminiErrorObject> for GeminiErrorBody {
    fn from(inner: GeminiErrorObject) -> Self {
        Self { inner }
    }
}
