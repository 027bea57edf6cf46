//! Shopify webhook endpoint.

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
};
use tracing::{debug, info, instrument};

use crate::error::AppError;
use crate::state::AppState;
use crate::webhooks::{HMAC_HEADER, WebhookDelivery, WebhookError, header, signature, spawn_dispatch};

/// Create webhook routes.
pub fn router() -> Router<AppState> {
    Router::new().route("/webhooks", post(receive))
}

/// Receive one webhook delivery.
///
/// Always answers `200` once the signature checks out; forwarding runs in
/// the background.
#[instrument(skip(state, headers, body))]
async fn receive(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    let hmac = header(&headers, HMAC_HEADER)
        .ok_or_else(|| WebhookError::InvalidSignature("Missing signature header".into()))?;
    signature::verify(&state.config().shopify.api_secret, &body, hmac)?;

    let delivery = WebhookDelivery::from_headers(&headers)?;

    if let Some(event_id) = &delivery.event_id
        && !state.webhook_cache().claim(&delivery.shop, event_id).await
    {
        debug!(
            topic = %delivery.topic,
            shop = %delivery.shop,
            event_id = %event_id,
            "duplicate webhook delivery ignored"
        );
        return Ok(StatusCode::OK);
    }

    info!(
        topic = %delivery.topic,
        shop = %delivery.shop,
        event_id = ?delivery.event_id,
        "webhook received"
    );

    // Detached: the outcome is logged inside the task.
    drop(spawn_dispatch(state, delivery));

    Ok(StatusCode::OK)
}
