use serde::Serialize;

/// `generationConfig` object. Only the output modalities are set.
#[derive(Debug, Clone, Serialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_modalities: Option<Vec<String>>,
}

impl GenerationConfig {
    /// Image generation models require text to be listed alongside image.
    pub fn image_output() -> Self {
        Self {
            response_modalities: Some(vec!["TEXT".to_string(), "IMAGE".to_string()]),
        }
    }
}
