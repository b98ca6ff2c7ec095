#![allow(dead_code)]

use axum::{
    Router,
    body::Bytes,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use groundchat::config::UpstreamConfig;
use groundchat::server::RelayState;
use groundchat::upstream::UpstreamCaller;
use serde_json::Value;
use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
};
use tokio::net::TcpListener;
use url::Url;

pub const TEST_API_KEY: &str = "test-upstream-key";

/// One request as the fake upstream saw it.
#[derive(Debug, Clone)]
pub struct Captured {
    pub path: String,
    pub key: Option<String>,
    pub body: Value,
}

/// Fake generation API. Answers from a script, one entry per call, and
/// records every request.
#[derive(Clone, Default)]
pub struct MockUpstream {
    script: Arc<Mutex<VecDeque<(StatusCode, String)>>>,
    reqs: Arc<Mutex<Vec<Captured>>>,
}

impl MockUpstream {
    pub fn scripted(replies: impl IntoIterator<Item = (StatusCode, Value)>) -> Self {
        let mock = Self::default();
        for (status, body) in replies {
            mock.push_raw(status, body.to_string());
        }
        mock
    }

    pub fn push_raw(&self, status: StatusCode, body: impl Into<String>) {
        self.script.lock().unwrap().push_back((status, body.into()));
    }

    pub fn calls(&self) -> usize {
        self.reqs.lock().unwrap().len()
    }

    pub fn captured(&self) -> Vec<Captured> {
        self.reqs.lock().unwrap().clone()
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/text", post(mock_generate))
            .route("/image", post(mock_generate))
            .with_state(self.clone())
    }
}

async fn mock_generate(
    State(mock): State<MockUpstream>,
    uri: axum::http::Uri,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    mock.reqs.lock().unwrap().push(Captured {
        path: uri.path().to_string(),
        key: query.get("key").cloned(),
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    });

    let next = mock.script.lock().unwrap().pop_front();
    match next {
        Some((status, body)) => {
            (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
        }
        None => (StatusCode::IM_A_TEAPOT, "script exhausted").into_response(),
    }
}

pub async fn spawn_test_server(app: Router) -> Url {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    let base = Url::parse(&format!("http://{addr}/")).expect("valid base url");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server run");
    });

    base
}

/// A client that ignores proxy environment variables, so loopback calls stay local.
pub fn local_client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .build()
        .expect("build reqwest client")
}

/// Upstream settings pointing at `base` with millisecond backoff.
pub fn upstream_config(base: &Url, api_key: Option<&str>) -> UpstreamConfig {
    UpstreamConfig {
        api_key: api_key.map(str::to_string),
        text_url: base.join("text").expect("text url"),
        image_url: base.join("image").expect("image url"),
        retry_base_delay_ms: 1,
        ..UpstreamConfig::default()
    }
}

pub fn relay_state(upstream: UpstreamConfig) -> RelayState {
    RelayState::with_caller(UpstreamCaller::new(local_client()), upstream)
}
