//! Session hand-off from the OAuth front end.
//!
//! Whatever completes Shopify OAuth (or token exchange) for this app posts
//! the shop's offline session here. The body is signed like a webhook:
//! `X-Shopify-Hmac-Sha256` carries the base64 HMAC-SHA256 of the raw body
//! keyed with the app secret.

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
};
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, instrument};

use embedded_admin_core::ShopDomain;

use crate::backend::ApiResponse;
use crate::error::AppError;
use crate::state::AppState;
use crate::webhooks::{HMAC_HEADER, WebhookError, after_auth, header, signature};

/// Create session hand-off routes.
pub fn router() -> Router<AppState> {
    Router::new().route("/auth/session", post(receive_session))
}

/// Offline session for one shop. No `Debug`: it holds the raw token.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionGrant {
    shop: ShopDomain,
    access_token: String,
}

/// Store the session and register the shop with the backend.
///
/// Answers `200` with the backend envelope, or `502` with it when the
/// backend rejected the registration. The session is kept either way.
#[instrument(skip(state, headers, body))]
async fn receive_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<ApiResponse<Value>>), AppError> {
    let hmac = header(&headers, HMAC_HEADER)
        .ok_or_else(|| WebhookError::InvalidSignature("Missing signature header".into()))?;
    signature::verify(&state.config().shopify.api_secret, &body, hmac)?;

    let grant: SessionGrant = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid session body: {e}")))?;
    let token = grant.access_token.trim();
    if token.is_empty() {
        return Err(AppError::BadRequest("accessToken must not be empty".into()));
    }

    info!(shop = %grant.shop, "session received");
    let response = after_auth(&state, grant.shop, SecretString::from(token)).await;

    let status = if response.is_success() {
        StatusCode::OK
    } else {
        StatusCode::BAD_GATEWAY
    };
    Ok((status, Json(response)))
}
