use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A single conversation turn or system instruction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Content {
    /// `"user"` or `"model"`; absent for `systemInstruction`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(default)]
    pub parts: Vec<Part>,

    #[serde(default, flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Content {
    /// A content block holding one text part.
    pub fn text(role: Option<&str>, text: impl Into<String>) -> Self {
        Self {
            role: role.map(str::to_string),
            parts: vec![Part::text(text)],
            extra: BTreeMap::new(),
        }
    }

    /// Role-less instruction content, `None` when the text is blank.
    pub fn instruction(text: &str) -> Option<Self> {
        (!text.trim().is_empty()).then(|| Self::text(None, text))
    }

    /// First text part, if any.
    pub fn first_text(&self) -> Option<&str> {
        self.parts.iter().find_map(|part| part.text.as_deref())
    }
}

/// One piece of a `Content` turn. Text and inline media are modeled; other
/// part kinds are preserved in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Inline media, `{ "mimeType": ..., "data": <base64> }`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,

    #[serde(default, flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub data: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn role_is_transparent_string() {
        let input = json!({
            "role": "SYSTEM",
            "parts": [{"text": "x"}]
        });

        let content: Content = serde_json::from_value(input.clone()).unwrap();
        assert_eq!(content.role.as_deref(), Some("SYSTEM"));
        assert_eq!(serde_json::to_value(&content).unwrap(), input);
    }

    #[test]
    fn inline_data_field_maps() {
        let content: Content = serde_json::from_value(json!({
            "role": "model",
            "parts": [
                {"text": "here you go"},
                {"inlineData": {"mimeType": "image/png", "data": "abc123"}}
            ]
        }))
        .unwrap();

        assert_eq!(content.first_text(), Some("here you go"));
        let inline = content.parts[1].inline_data.as_ref().unwrap();
        assert_eq!(inline.mime_type, "image/png");
        assert_eq!(inline.data, "abc123");
    }

    #[test]
    fn unmodeled_parts_are_preserved() {
        let input = json!({
            "role": "model",
            "parts": [{"functionCall": {"name": "get_weather", "args": {"city": "London"}}}]
        });

        let content: Content = serde_json::from_value(input.clone()).unwrap();
        assert!(content.first_text().is_none());
        assert_eq!(serde_json::to_value(&content).unwrap(), input);
    }

    #[test]
    fn blank_instruction_is_none() {
        assert!(Content::instruction(" \n").is_none());
        let si = Content::instruction("be brief").unwrap();
        assert!(si.role.is_none());
        assert_eq!(si.first_text(), Some("be brief"));
    }
}
