use serde::Serialize;
use serde_json::{Map, Value};

/// `tools[]` entry.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    /// Search grounding switch. Presence of the (empty) object enables it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_search: Option<Map<String, Value>>,
}

impl Tool {
    pub fn google_search() -> Self {
        Self {
            google_search: Some(Map::new()),
        }
    }
}
