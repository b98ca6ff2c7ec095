use super::{UpstreamOutcome, preview};
use crate::config::UpstreamConfig;
use crate::retry::RetryPolicy;
use crate::utils::logging::with_pretty_json_debug;
use reqwest::RequestBuilder;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

pub const GROUNDCHAT_USER_AGENT: &str = concat!("groundchat/", env!("CARGO_PKG_VERSION"));

/// Posts JSON payloads to the upstream generation API with the secret key as
/// the `key` query parameter.
#[derive(Debug, Clone)]
pub struct UpstreamCaller {
    client: reqwest::Client,
}

impl UpstreamCaller {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Builds the shared reqwest client from upstream settings.
    pub fn from_config(cfg: &UpstreamConfig) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(GROUNDCHAT_USER_AGENT));

        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(cfg.connect_timeout())
            .timeout(cfg.request_timeout());

        if let Some(proxy_url) = cfg.proxy.as_ref() {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url.as_str())?);
        }

        Ok(Self::new(builder.build()?))
    }

    /// One POST, no retries. Never fails: every problem is folded into the outcome.
    pub async fn post<T>(&self, label: &'static str, url: &Url, api_key: &str, body: &T) -> UpstreamOutcome
    where
        T: Serialize,
    {
        let mut url = url.clone();
        url.query_pairs_mut().append_pair("key", api_key);

        exchange(label, self.client.post(url).json(body)).await
    }

    /// [`post`](Self::post) under `policy`, retrying rate limits, quota errors
    /// and undecodable or missing responses.
    pub async fn post_with_retry<T>(
        &self,
        label: &'static str,
        policy: &RetryPolicy,
        url: &Url,
        api_key: &str,
        body: &T,
    ) -> UpstreamOutcome
    where
        T: Serialize,
    {
        with_pretty_json_debug(body, |pretty_body| {
            debug!(call = label, url = %url, body = %pretty_body, "[{label}] Upstream payload");
        });

        policy
            .run(
                label,
                || self.post(label, url, api_key, body),
                UpstreamOutcome::is_retryable,
            )
            .await
    }
}

/// Sends `request` and classifies what comes back. Shared by the proxy's
/// upstream calls and the chat client's calls to the proxy.
pub async fn exchange(label: &'static str, request: RequestBuilder) -> UpstreamOutcome {
    let start = Instant::now();
    let resp = match request.send().await {
        Ok(resp) => resp,
        Err(e) => {
            warn!(call = label, error = %e, "[{label}] Unreachable");
            return UpstreamOutcome::Unreachable {
                reason: e.to_string(),
            };
        }
    };

    let status = resp.status();
    let bytes = match resp.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(call = label, %status, error = %e, "[{label}] Failed to read response body");
            return UpstreamOutcome::Undecodable {
                status,
                reason: e.to_string(),
            };
        }
    };

    info!(
        call = label,
        %status,
        latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
        bytes = bytes.len(),
        "[{label}] Responded"
    );

    match serde_json::from_slice(&bytes) {
        Ok(body) => UpstreamOutcome::Reply { status, body },
        Err(e) => {
            warn!(
                call = label,
                %status,
                error = %e,
                body = %preview(&String::from_utf8_lossy(&bytes)),
                "[{label}] Response body is not JSON"
            );
            UpstreamOutcome::Undecodable {
                status,
                reason: e.to_string(),
            }
        }
    }
}
