//! Request bodies accepted by the proxy's own endpoints.

use crate::gemini::Content;
use serde::{Deserialize, Serialize};

/// `POST /api/chat` body: the conversation already mapped to upstream roles.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatProxyRequest {
    pub contents: Vec<Content>,
}

/// `POST /api/image` body. Both levels are optional so a missing prompt
/// reaches validation instead of failing deserialization.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ImageProxyRequest {
    #[serde(default)]
    pub instances: Option<ImageInstances>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ImageInstances {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

impl ImageProxyRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            instances: Some(ImageInstances {
                prompt: Some(prompt.into()),
            }),
        }
    }

    /// The prompt if present and not blank.
    pub fn prompt(&self) -> Option<&str> {
        self.instances
            .as_ref()
            .and_then(|instances| instances.prompt.as_deref())
            .filter(|prompt| !prompt.trim().is_empty())
    }
}
