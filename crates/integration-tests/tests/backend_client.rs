//! Integration tests for the backend API client and shop registration.

use axum::http::{Method, StatusCode};
use reqwest::multipart::Form;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};

use embedded_admin::backend::{ApiResponse, BackendClient, ResponseCode};
use embedded_admin::webhooks::{after_auth, signature};
use embedded_admin_core::ShopDomain;
use embedded_admin_integration_tests::{FakeBackend, TEST_SECRET, TEST_SHOP, test_state};

fn client(backend: &FakeBackend) -> BackendClient {
    BackendClient::new(backend.url()).expect("client builds")
}

fn shop() -> ShopDomain {
    ShopDomain::parse(TEST_SHOP).expect("valid shop")
}

// =============================================================================
// Envelope handling
// =============================================================================

#[tokio::test]
async fn test_success_envelope_is_returned() {
    let mut backend = FakeBackend::start_with(
        StatusCode::OK,
        json!({"statusCode": 200, "message": "found", "data": {"id": 7, "name": "Demo"}}),
    )
    .await;

    let response: ApiResponse<Value> = client(&backend).get("/shop", &[]).await;

    assert!(response.is_success());
    assert_eq!(response.message, "found");
    assert_eq!(response.into_data(), Some(json!({"id": 7, "name": "Demo"})));

    let request = backend.next_request().await;
    assert_eq!(request.method, Method::GET);
    assert_eq!(request.path, "/api/shop");
    assert_eq!(request.hmac, None);
}

#[tokio::test]
async fn test_get_sends_query_params() {
    let mut backend = FakeBackend::start().await;

    let _: ApiResponse<Value> = client(&backend)
        .get("/products", &[("page", "2"), ("keyword", "red boots")])
        .await;

    let request = backend.next_request().await;
    assert_eq!(request.path, "/api/products");
    assert_eq!(request.query.as_deref(), Some("page=2&keyword=red+boots"));
}

#[tokio::test]
async fn test_error_body_is_folded() {
    let mut backend = FakeBackend::start_with(
        StatusCode::UNPROCESSABLE_ENTITY,
        json!({"code": 409, "message": "shop already registered", "errorCode": "SHOP_EXISTS"}),
    )
    .await;

    let response: ApiResponse<Value> = client(&backend)
        .post("/shop", &json!({"domain": TEST_SHOP}))
        .await;

    assert!(!response.is_success());
    assert_eq!(response.status_code, ResponseCode(409));
    assert_eq!(response.message, "shop already registered");
    assert_eq!(response.error_code.as_deref(), Some("SHOP_EXISTS"));
    assert!(response.data.is_none());
    backend.next_request().await;
}

#[tokio::test]
async fn test_error_without_body_uses_http_status() {
    let backend = FakeBackend::start_with(StatusCode::SERVICE_UNAVAILABLE, Value::Null).await;

    let response: ApiResponse<Value> = client(&backend)
        .put("/shop", &json!({"domain": TEST_SHOP}))
        .await;

    assert_eq!(response.status_code, ResponseCode(503));
    assert_eq!(response.message, "Service Unavailable");
    assert_eq!(response.error_code, None);
}

#[tokio::test]
async fn test_unparseable_success_body_is_failure() {
    let backend = FakeBackend::start_with(StatusCode::OK, json!(["not", "an", "envelope"])).await;

    let response: ApiResponse<Value> = client(&backend).patch("/shop", &json!({})).await;

    assert_eq!(response.status_code, ResponseCode::INTERNAL_SERVER_ERROR);
    assert!(response.message.starts_with("Failed to parse response"));
}

#[tokio::test]
async fn test_respond_with_changes_later_answers() {
    let mut backend = FakeBackend::start().await;
    let client = client(&backend);

    let first: ApiResponse<Value> = client.get("/shop", &[]).await;
    backend
        .respond_with(StatusCode::NOT_FOUND, json!({"message": "no such shop"}))
        .await;
    let second: ApiResponse<Value> = client.get("/shop", &[]).await;

    assert!(first.is_success());
    assert_eq!(second.status_code, ResponseCode::NOT_FOUND);
    assert_eq!(second.message, "no such shop");
    backend.next_request().await;
    backend.next_request().await;
}

// =============================================================================
// Request shapes
// =============================================================================

#[tokio::test]
async fn test_with_hmac_signs_only_that_handle() {
    let mut backend = FakeBackend::start().await;
    let base = client(&backend);
    let signed = base.with_hmac("c2lnbmF0dXJl").expect("valid header");

    let _: ApiResponse<Value> = signed.post("/shop", &json!({})).await;
    let _: ApiResponse<Value> = base.post("/shop", &json!({})).await;

    assert_eq!(
        backend.next_request().await.hmac.as_deref(),
        Some("c2lnbmF0dXJl")
    );
    assert_eq!(backend.next_request().await.hmac, None);
}

#[tokio::test]
async fn test_delete_with_and_without_body() {
    let mut backend = FakeBackend::start().await;
    let client = client(&backend);

    let _: ApiResponse<Value> = client
        .delete("/shop", Some(&json!({"domain": TEST_SHOP})))
        .await;
    let _: ApiResponse<Value> = client.delete::<Value, Value>("/shop", None).await;

    let with_body = backend.next_request().await;
    assert_eq!(with_body.method, Method::DELETE);
    assert_eq!(with_body.json, json!({"domain": TEST_SHOP}));

    let without_body = backend.next_request().await;
    assert_eq!(without_body.method, Method::DELETE);
    assert!(without_body.raw_body.is_empty());
}

#[tokio::test]
async fn test_multipart_upload() {
    let mut backend = FakeBackend::start().await;

    let form = Form::new()
        .text("domain", TEST_SHOP)
        .text("kind", "logo");
    let response: ApiResponse<Value> = client(&backend).post_multipart("/shop/assets", form).await;

    assert!(response.is_success());
    let request = backend.next_request().await;
    assert_eq!(request.path, "/api/shop/assets");
    assert!(
        request
            .content_type
            .as_deref()
            .is_some_and(|ct| ct.starts_with("multipart/form-data; boundary="))
    );
    assert!(request.raw_body.contains("name=\"domain\""));
    assert!(request.raw_body.contains(TEST_SHOP));
}

// =============================================================================
// Shop registration
// =============================================================================

#[tokio::test]
async fn test_after_auth_stores_session_and_registers_shop() {
    let mut backend = FakeBackend::start().await;
    let state = test_state(backend.url());

    let response = after_auth(&state, shop(), SecretString::from("shpat_fresh_token")).await;

    assert!(response.is_success());
    let stored = state
        .sessions()
        .access_token(&shop())
        .await
        .expect("session stored");
    assert_eq!(stored.expose_secret(), "shpat_fresh_token");

    let request = backend.next_request().await;
    assert_eq!(request.method, Method::POST);
    assert_eq!(request.path, "/api/shop");
    assert_eq!(
        request.json,
        json!({"domain": TEST_SHOP, "token": "shpat_fresh_token"})
    );
    let expected = signature::sign_shop(&SecretString::from(TEST_SECRET), &shop())
        .expect("signing succeeds");
    assert_eq!(request.hmac, Some(expected));
}

#[tokio::test]
async fn test_after_auth_reports_backend_failure() {
    let backend = FakeBackend::start_with(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({"message": "database unavailable"}),
    )
    .await;
    let state = test_state(backend.url());

    let response = after_auth(&state, shop(), SecretString::from("shpat_fresh_token")).await;

    assert_eq!(response.status_code, ResponseCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.message, "database unavailable");
    // The session is kept so webhooks can still be forwarded later.
    assert!(state.sessions().access_token(&shop()).await.is_some());
}
