//! Integration test support for the embedded admin.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p embedded-admin-integration-tests
//! ```
//!
//! Nothing external is needed: the admin router is driven in-process with
//! `tower::ServiceExt::oneshot`, and the backend API is replaced by
//! [`FakeBackend`], an axum server on an ephemeral loopback port that records
//! every request it receives.

#![allow(clippy::expect_used, clippy::missing_panics_doc)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::State,
    http::{HeaderMap, Method, Request, StatusCode, Uri},
};
use secrecy::SecretString;
use serde_json::Value;
use tokio::sync::{Mutex, mpsc};
use url::Url;

use embedded_admin::cache::Clock;
use embedded_admin::config::{AdminConfig, ShopifyAppConfig};
use embedded_admin::state::AppState;
use embedded_admin::webhooks::{EVENT_ID_HEADER, HMAC_HEADER, SHOP_DOMAIN_HEADER, TOPIC_HEADER, signature};

/// App secret used by every test state.
pub const TEST_SECRET: &str = "k7Qx2mVb9Lr4Tz8Wc1Np";

/// Shop used by most tests.
pub const TEST_SHOP: &str = "demo-store.myshopify.com";

/// How long to wait for a detached task to reach the fake backend.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Admin configuration pointing at `backend_url`.
#[must_use]
pub fn test_config(backend_url: &Url) -> AdminConfig {
    AdminConfig::new(
        ShopifyAppConfig {
            api_key: "test-client-id".to_string(),
            api_secret: SecretString::from(TEST_SECRET),
        },
        backend_url.clone(),
    )
}

/// Application state pointing at `backend_url`.
#[must_use]
pub fn test_state(backend_url: &Url) -> AppState {
    AppState::new(test_config(backend_url)).expect("state builds")
}

/// Application state whose webhook cache reads time from `clock`.
#[must_use]
pub fn test_state_with_clock(backend_url: &Url, clock: Arc<dyn Clock>) -> AppState {
    AppState::with_clock(test_config(backend_url), clock).expect("state builds")
}

/// A webhook request signed with [`TEST_SECRET`].
#[must_use]
pub fn webhook_request(topic: &str, shop: &str, event_id: Option<&str>, body: &str) -> Request<Body> {
    let hmac = signature::sign(&SecretString::from(TEST_SECRET), body.as_bytes())
        .expect("signing succeeds");
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/webhooks")
        .header("content-type", "application/json")
        .header(TOPIC_HEADER, topic)
        .header(SHOP_DOMAIN_HEADER, shop)
        .header(HMAC_HEADER, hmac);
    if let Some(event_id) = event_id {
        builder = builder.header(EVENT_ID_HEADER, event_id);
    }
    builder.body(Body::from(body.to_string())).expect("request builds")
}

/// A `POST /auth/session` request for `shop` signed with [`TEST_SECRET`].
#[must_use]
pub fn session_request(shop: &str, access_token: &str) -> Request<Body> {
    let body = serde_json::json!({"shop": shop, "accessToken": access_token}).to_string();
    signed_session_request(&body)
}

/// A `POST /auth/session` request with a raw `body` signed with
/// [`TEST_SECRET`].
#[must_use]
pub fn signed_session_request(body: &str) -> Request<Body> {
    let hmac = signature::sign(&SecretString::from(TEST_SECRET), body.as_bytes())
        .expect("signing succeeds");
    Request::builder()
        .method(Method::POST)
        .uri("/auth/session")
        .header("content-type", "application/json")
        .header(HMAC_HEADER, hmac)
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

/// One request received by the fake backend.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub hmac: Option<String>,
    pub content_type: Option<String>,
    pub raw_body: String,
    /// `raw_body` parsed as JSON, `Null` when it is not JSON.
    pub json: Value,
}

#[derive(Clone)]
struct FakeBackendState {
    tx: mpsc::UnboundedSender<RecordedRequest>,
    response: Arc<Mutex<(StatusCode, Value)>>,
}

/// Stand-in for the backend API.
pub struct FakeBackend {
    url: Url,
    rx: mpsc::UnboundedReceiver<RecordedRequest>,
    response: Arc<Mutex<(StatusCode, Value)>>,
}

impl FakeBackend {
    /// Start a backend that answers every request with `200` and a success
    /// envelope.
    pub async fn start() -> Self {
        Self::start_with(
            StatusCode::OK,
            serde_json::json!({"statusCode": 200, "message": "ok", "data": {}}),
        )
        .await
    }

    /// Start a backend that answers every request with `status` and `body`.
    pub async fn start_with(status: StatusCode, body: Value) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let response = Arc::new(Mutex::new((status, body)));
        let state = FakeBackendState {
            tx,
            response: Arc::clone(&response),
        };

        let router = Router::new().fallback(record).with_state(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind loopback");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("fake backend serves");
        });

        Self {
            url: Url::parse(&format!("http://{addr}/api")).expect("valid url"),
            rx,
            response,
        }
    }

    /// Base URL to configure the admin with (`http://127.0.0.1:{port}/api`).
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// Change what the backend answers from now on.
    pub async fn respond_with(&self, status: StatusCode, body: Value) {
        *self.response.lock().await = (status, body);
    }

    /// Wait for the next request, failing the test after a timeout.
    pub async fn next_request(&mut self) -> RecordedRequest {
        tokio::time::timeout(REQUEST_TIMEOUT, self.rx.recv())
            .await
            .expect("backend request within timeout")
            .expect("fake backend still running")
    }

    /// Assert nothing reaches the backend within `wait`.
    pub async fn assert_no_request(&mut self, wait: Duration) {
        if let Ok(Some(request)) = tokio::time::timeout(wait, self.rx.recv()).await {
            panic!("unexpected backend request: {} {}", request.method, request.path);
        }
    }
}

async fn record(
    State(state): State<FakeBackendState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let raw_body = String::from_utf8_lossy(&body).into_owned();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);

    let request = RecordedRequest {
        method,
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        hmac: header(HMAC_HEADER),
        content_type: header("content-type"),
        raw_body,
        json,
    };
    // The receiver may be gone when a test finished early.
    let _ = state.tx.send(request);

    let (status, body) = state.response.lock().await.clone();
    (status, Json(body))
}
