use crate::error::SessionError;
use crate::upstream::{GROUNDCHAT_USER_AGENT, UpstreamOutcome, error_message, exchange};
use async_trait::async_trait;
use groundchat_schema::{ChatProxyRequest, ImageProxyRequest};
use url::Url;

/// The proxy's three entry points as seen by a chat client.
#[async_trait]
pub trait ChatProxy: Send + Sync {
    /// Existence check: `Ok` when the proxy is up and has its API key.
    async fn probe(&self) -> Result<(), SessionError>;

    /// One chat generation call, no retries.
    async fn generate(&self, request: &ChatProxyRequest) -> UpstreamOutcome;

    /// One image generation call, no retries.
    async fn generate_image(&self, request: &ImageProxyRequest) -> UpstreamOutcome;
}

/// [`ChatProxy`] over HTTP against a running `groundchat` server.
#[derive(Debug, Clone)]
pub struct HttpChatProxy {
    client: reqwest::Client,
    chat_url: Url,
    image_url: Url,
}

impl HttpChatProxy {
    /// `base` is the server root, e.g. `http://127.0.0.1:8188/`.
    pub fn new(base: &Url) -> Result<Self, SessionError> {
        let client = reqwest::Client::builder()
            .user_agent(GROUNDCHAT_USER_AGENT)
            .build()?;
        Self::with_client(client, base)
    }

    pub fn with_client(client: reqwest::Client, base: &Url) -> Result<Self, SessionError> {
        Ok(Self {
            client,
            chat_url: base.join("api/chat")?,
            image_url: base.join("api/image")?,
        })
    }
}

#[async_trait]
impl ChatProxy for HttpChatProxy {
    async fn probe(&self) -> Result<(), SessionError> {
        match exchange("proxy-probe", self.client.get(self.chat_url.clone())).await {
            UpstreamOutcome::Reply { status, .. } | UpstreamOutcome::Undecodable { status, .. }
                if status.is_success() =>
            {
                Ok(())
            }
            UpstreamOutcome::Reply { status, body } => {
                let reason = error_message(&body)
                    .map_or_else(|| format!("proxy answered {status}"), str::to_string);
                Err(SessionError::ProxyUnavailable(reason))
            }
            UpstreamOutcome::Undecodable { status, .. } => Err(SessionError::ProxyUnavailable(
                format!("proxy answered {status}"),
            )),
            UpstreamOutcome::Unreachable { reason } => Err(SessionError::ProxyUnavailable(reason)),
        }
    }

    async fn generate(&self, request: &ChatProxyRequest) -> UpstreamOutcome {
        exchange(
            "proxy-chat",
            self.client.post(self.chat_url.clone()).json(request),
        )
        .await
    }

    async fn generate_image(&self, request: &ImageProxyRequest) -> UpstreamOutcome {
        exchange(
            "proxy-image",
            self.client.post(self.image_url.clone()).json(request),
        )
        .await
    }
}
