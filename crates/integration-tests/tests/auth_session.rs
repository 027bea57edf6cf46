//! Integration tests for the offline session hand-off.

use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use tower::ServiceExt;

use embedded_admin::app;
use embedded_admin::state::AppState;
use embedded_admin::webhooks::signature;
use embedded_admin_core::ShopDomain;
use embedded_admin_integration_tests::{
    FakeBackend, TEST_SECRET, TEST_SHOP, session_request, signed_session_request, test_state,
    webhook_request,
};

const QUIET: Duration = Duration::from_millis(200);

fn shop() -> ShopDomain {
    ShopDomain::parse(TEST_SHOP).expect("valid shop")
}

async fn send(state: &AppState, request: Request<Body>) -> (StatusCode, Value) {
    let response = app(state.clone())
        .oneshot(request)
        .await
        .expect("router responds");
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body reads");
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

#[tokio::test]
async fn test_session_is_stored_and_shop_registered() {
    let mut backend = FakeBackend::start().await;
    let state = test_state(backend.url());

    let (status, json) = send(&state, session_request(TEST_SHOP, "shpat_offline_token")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["statusCode"], 200);

    let stored = state
        .sessions()
        .access_token(&shop())
        .await
        .expect("session stored");
    assert_eq!(stored.expose_secret(), "shpat_offline_token");

    let registered = backend.next_request().await;
    assert_eq!(registered.method, Method::POST);
    assert_eq!(registered.path, "/api/shop");
    assert_eq!(
        registered.json,
        json!({"domain": TEST_SHOP, "token": "shpat_offline_token"})
    );
    let expected = signature::sign_shop(&SecretString::from(TEST_SECRET), &shop())
        .expect("signing succeeds");
    assert_eq!(registered.hmac, Some(expected));
}

#[tokio::test]
async fn test_webhooks_are_forwarded_after_hand_off() {
    let mut backend = FakeBackend::start().await;
    let state = test_state(backend.url());

    let (status, _) = send(&state, session_request(TEST_SHOP, "shpat_offline_token")).await;
    assert_eq!(status, StatusCode::OK);
    backend.next_request().await;

    let webhook = webhook_request("shop/update", TEST_SHOP, Some("evt-1"), "{}");
    let (status, _) = send(&state, webhook).await;
    assert_eq!(status, StatusCode::OK);

    let forwarded = backend.next_request().await;
    assert_eq!(forwarded.path, "/api/webhooks/shop/update");
    assert_eq!(
        forwarded.json,
        json!({"domain": TEST_SHOP, "token": "shpat_offline_token"})
    );
}

#[tokio::test]
async fn test_unsigned_session_is_rejected() {
    let mut backend = FakeBackend::start().await;
    let state = test_state(backend.url());

    let body = json!({"shop": TEST_SHOP, "accessToken": "shpat_offline_token"}).to_string();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/auth/session")
        .header("content-type", "application/json")
        .body(Body::from(body))
        .expect("request builds");

    let (status, _) = send(&state, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(state.sessions().access_token(&shop()).await.is_none());
    backend.assert_no_request(QUIET).await;
}

#[tokio::test]
async fn test_tampered_session_is_rejected() {
    let backend = FakeBackend::start().await;
    let state = test_state(backend.url());

    let mut request = session_request(TEST_SHOP, "shpat_offline_token");
    *request.body_mut() = Body::from(
        json!({"shop": "attacker.myshopify.com", "accessToken": "shpat_offline_token"})
            .to_string(),
    );

    let (status, _) = send(&state, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_invalid_shop_is_bad_request() {
    let mut backend = FakeBackend::start().await;
    let state = test_state(backend.url());

    let (status, _) = send(&state, session_request("shop.example.com", "shpat_token")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    backend.assert_no_request(QUIET).await;
}

#[tokio::test]
async fn test_blank_token_is_bad_request() {
    let backend = FakeBackend::start().await;
    let state = test_state(backend.url());

    let (status, _) = send(&state, session_request(TEST_SHOP, "   ")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(state.sessions().access_token(&shop()).await.is_none());
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let backend = FakeBackend::start().await;
    let state = test_state(backend.url());

    let (status, _) = send(&state, signed_session_request("not json")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_backend_rejection_is_bad_gateway() {
    let backend = FakeBackend::start_with(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({"message": "database unavailable"}),
    )
    .await;
    let state = test_state(backend.url());

    let (status, json) = send(&state, session_request(TEST_SHOP, "shpat_offline_token")).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["statusCode"], 500);
    assert_eq!(json["message"], "database unavailable");
    assert!(state.sessions().access_token(&shop()).await.is_some());
}
