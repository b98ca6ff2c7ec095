use thiserror::Error as ThisError;

/// Reasons a chat session refuses to send. Generation failures are not errors:
/// they become assistant turns.
#[derive(Debug, ThisError)]
pub enum SessionError {
    #[error("Message is empty")]
    EmptyMessage,

    /// The proxy reported a missing API key or could not be reached when probed.
    #[error("Chat proxy is unavailable: {0}")]
    ProxyUnavailable(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
}
