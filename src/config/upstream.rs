use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::time::Duration;
use url::Url;

use crate::retry::RetryPolicy;

pub const DEFAULT_TEXT_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent";
pub const DEFAULT_IMAGE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash-preview-image-generation:generateContent";
pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "You are a helpful assistant. Use Google Search to ground your answers in current, verifiable information and keep replies concise.";

/// Upstream generative API configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    /// Secret API key injected into every upstream call. Optional: when absent every
    /// entry point answers with a misconfiguration error instead of calling upstream.
    /// TOML: `upstream.api_key`. Env: `GEMINI_API_KEY` or `GROUNDCHAT_UPSTREAM__API_KEY`.
    #[serde(default, deserialize_with = "deserialize_optional_string_lax")]
    pub api_key: Option<String>,

    /// Text generation endpoint (`...:generateContent`).
    /// TOML: `upstream.text_url`.
    #[serde(default = "default_text_url")]
    pub text_url: Url,

    /// Image generation endpoint (`...:generateContent` on an image-capable model).
    /// TOML: `upstream.image_url`.
    #[serde(default = "default_image_url")]
    pub image_url: Url,

    /// Fixed system instruction attached to every chat request.
    /// TOML: `upstream.system_instruction`.
    #[serde(default = "default_system_instruction")]
    pub system_instruction: String,

    /// Optional upstream HTTP proxy. If set, used for the reqwest client.
    /// TOML: `upstream.proxy`. Example: `http://127.0.0.1:1080`.
    #[serde(default)]
    pub proxy: Option<Url>,

    /// TOML: `upstream.connect_timeout_secs`. Default: `10`.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// TOML: `upstream.request_timeout_secs`. Default: `600`.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Total attempts per logical call, first attempt included.
    /// TOML: `upstream.retry_max_attempts`. Default: `5`.
    #[serde(default = "default_retry_max_attempts")]
    pub retry_max_attempts: usize,

    /// Delay before the first retry; doubles on every further retry.
    /// TOML: `upstream.retry_base_delay_ms`. Default: `1000`.
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            text_url: default_text_url(),
            image_url: default_image_url(),
            system_instruction: default_system_instruction(),
            proxy: None,
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            retry_max_attempts: default_retry_max_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
        }
    }
}

impl UpstreamConfig {
    /// The API key, treating empty or whitespace-only values as absent.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry_max_attempts,
            Duration::from_millis(self.retry_base_delay_ms),
        )
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn deserialize_optional_string_lax<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(deserializer)?;

    match v {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(_) => Err(serde::de::Error::custom(
            "expected a string or a number for upstream.api_key",
        )),
    }
}

fn default_text_url() -> Url {
    Url::parse(DEFAULT_TEXT_URL).expect("valid default text generation URL")
}

fn default_image_url() -> Url {
    Url::parse(DEFAULT_IMAGE_URL).expect("valid default image generation URL")
}

fn default_system_instruction() -> String {
    DEFAULT_SYSTEM_INSTRUCTION.to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    10 * 60
}

fn default_retry_max_attempts() -> usize {
    RetryPolicy::DEFAULT_MAX_ATTEMPTS
}

fn default_retry_base_delay_ms() -> u64 {
    1000
}
