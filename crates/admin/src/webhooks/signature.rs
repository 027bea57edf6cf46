//! HMAC-SHA256 signatures shared with Shopify and the backend.
//!
//! Inbound: Shopify signs each webhook body with the app secret and sends
//! the base64 digest in `X-Shopify-Hmac-Sha256`.
//!
//! Outbound: the backend authenticates shop-scoped calls with the base64
//! digest of the shop domain, keyed with the same secret.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use tracing::{debug, instrument};

use embedded_admin_core::ShopDomain;

use super::WebhookError;

/// Base64 HMAC-SHA256 of `message` keyed with `secret`.
///
/// # Errors
///
/// Returns error if the key is rejected by the MAC.
pub fn sign(secret: &SecretString, message: &[u8]) -> Result<String, WebhookError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.expose_secret().as_bytes())
        .map_err(|e| WebhookError::InvalidSignature(e.to_string()))?;
    mac.update(message);
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Signature the backend expects for calls about `shop`.
///
/// # Errors
///
/// Returns error if the key is rejected by the MAC.
pub fn sign_shop(secret: &SecretString, shop: &ShopDomain) -> Result<String, WebhookError> {
    sign(secret, shop.as_str().as_bytes())
}

/// Verify a webhook body against its `X-Shopify-Hmac-Sha256` header.
///
/// # Errors
///
/// Returns error if the signature does not match.
#[instrument(skip(secret, body, signature))]
pub fn verify(secret: &SecretString, body: &[u8], signature: &str) -> Result<(), WebhookError> {
    let expected = sign(secret, body)?;

    if !constant_time_compare(&expected, signature.trim()) {
        return Err(WebhookError::InvalidSignature(
            "Signature mismatch".to_string(),
        ));
    }

    debug!("Webhook signature verified");
    Ok(())
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}
