use crate::config::{Config, UpstreamConfig};
use crate::retry::RetryPolicy;
use crate::server::routes::chat::{chat_handler, chat_probe_handler};
use crate::server::routes::image::{image_handler, image_probe_handler};
use crate::upstream::UpstreamCaller;

use axum::{
    Json, Router,
    extract::Request,
    http::{HeaderName, HeaderValue, StatusCode, Version, header::USER_AGENT},
    middleware::{self, Next},
    response::Response,
    routing::get,
};
use base64::Engine as _;
use rand::RngCore;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

const MAX_REQUEST_ID_LEN: usize = 128;
const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

fn generate_request_id() -> String {
    // 96 bits => 16 chars base64url (no padding).
    let mut bytes = [0u8; 12];
    rand::rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

fn format_http_version(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_11 => "HTTP/1.1",
        Version::HTTP_2 => "HTTP/2",
        Version::HTTP_3 => "HTTP/3",
        _ => "HTTP/?",
    }
}

#[derive(Clone)]
pub struct RelayState {
    pub caller: UpstreamCaller,
    pub upstream: Arc<UpstreamConfig>,
    /// `None` when no key is configured; every API route then refuses to run.
    pub api_key: Option<Arc<str>>,
    pub retry: RetryPolicy,
}

impl RelayState {
    pub fn new(cfg: &Config) -> Result<Self, reqwest::Error> {
        let caller = UpstreamCaller::from_config(&cfg.upstream)?;
        Ok(Self::with_caller(caller, cfg.upstream.clone()))
    }

    pub fn with_caller(caller: UpstreamCaller, upstream: UpstreamConfig) -> Self {
        Self {
            caller,
            api_key: upstream.api_key().map(Arc::from),
            retry: upstream.retry_policy(),
            upstream: Arc::new(upstream),
        }
    }
}

async fn not_found_handler() -> StatusCode {
    StatusCode::NOT_FOUND
}

async fn health_handler() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

async fn access_log(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let version = req.version();

    let request_id = req
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty() && v.len() <= MAX_REQUEST_ID_LEN)
        .map_or_else(generate_request_id, str::to_string);

    let user_agent = req
        .headers()
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();

    let start = Instant::now();
    let mut resp = next.run(req).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        resp.headers_mut().insert(X_REQUEST_ID, value);
    }

    let status = resp.status();
    let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
    let path = uri.path();
    let protocol = format_http_version(version);

    if status.is_server_error() {
        error!(
            "| {:>3} | {} | {:^7} | {:<8} | {} | {}ms | {}",
            status.as_u16(),
            request_id,
            method.as_str(),
            protocol,
            path,
            latency_ms,
            user_agent
        );
    } else if status.is_client_error() {
        warn!(
            "| {:>3} | {} | {:^7} | {:<8} | {} | {}ms | {}",
            status.as_u16(),
            request_id,
            method.as_str(),
            protocol,
            path,
            latency_ms,
            user_agent
        );
    } else {
        info!(
            "| {:>3} | {} | {:^7} | {:<8} | {} | {}ms | {}",
            status.as_u16(),
            request_id,
            method.as_str(),
            protocol,
            path,
            latency_ms,
            user_agent
        );
    }

    resp
}

pub fn relay_router(state: RelayState, cors_allow_any_origin: bool) -> Router {
    let api = Router::new()
        .route("/api/chat", get(chat_probe_handler).post(chat_handler))
        .route("/api/image", get(image_probe_handler).post(image_handler));

    let router = Router::new()
        .merge(api)
        .route("/healthz", get(health_handler))
        .fallback(not_found_handler)
        .with_state(state);

    let router = if cors_allow_any_origin {
        router.layer(CorsLayer::permissive())
    } else {
        router
    };

    router.layer(middleware::from_fn(access_log))
}
