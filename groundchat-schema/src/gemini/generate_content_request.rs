//! Typed request schema for the upstream `generateContent` endpoint.
//!
//! Only the fields the proxy sets are modeled. Conversation turns keep their
//! own pass-through `extra` maps (see [`Content`]).

mod content;
mod generation;
mod tool;

use serde::Serialize;

pub use content::{Content, InlineData, Part};
pub use generation::GenerationConfig;
pub use tool::Tool;

/// Upstream `generateContent` request body, built by the proxy and never parsed.
///
/// Reference: <https://ai.google.dev/gemini-api/docs/text-generation>
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiGenerateContentRequest {
    pub contents: Vec<Content>,

    /// System-level instruction, a single text part without `role`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,
}

impl GeminiGenerateContentRequest {
    /// A grounded text request: the conversation, search grounding enabled and
    /// the given system instruction.
    pub fn grounded_text(contents: Vec<Content>, system_instruction: &str) -> Self {
        Self {
            contents,
            system_instruction: Content::instruction(system_instruction),
            generation_config: None,
            tools: Some(vec![Tool::google_search()]),
        }
    }

    /// A single-prompt request asking for image output.
    pub fn image_prompt(prompt: impl Into<String>) -> Self {
        Self {
            contents: vec![Content::text(None, prompt)],
            system_instruction: None,
            generation_config: Some(GenerationConfig::image_output()),
            tools: None,
        }
    }
}
