//! Shopify webhook ingestion.
//!
//! A delivery is verified, de-duplicated by event id, acknowledged at once,
//! and then forwarded to the backend in a detached task. Shopify treats a
//! response slower than five seconds as a failure and redelivers, so no
//! backend call happens before the `200`.

pub mod dispatch;
pub mod signature;

pub use dispatch::{DispatchOutcome, after_auth, dispatch, spawn_dispatch};

use axum::http::HeaderMap;
use thiserror::Error;

use embedded_admin_core::{ShopDomain, ShopDomainError, WebhookTopic};

pub const TOPIC_HEADER: &str = "X-Shopify-Topic";
pub const SHOP_DOMAIN_HEADER: &str = "X-Shopify-Shop-Domain";
pub const EVENT_ID_HEADER: &str = "X-Shopify-Event-Id";
pub use crate::backend::HMAC_HEADER;

/// Errors rejecting a webhook delivery.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("Missing header: {0}")]
    MissingHeader(&'static str),

    #[error("Invalid shop domain: {0}")]
    InvalidShop(#[from] ShopDomainError),

    #[error("Invalid webhook signature: {0}")]
    InvalidSignature(String),
}

/// The routing headers of one delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookDelivery {
    pub topic: WebhookTopic,
    pub shop: ShopDomain,
    pub event_id: Option<String>,
}

impl WebhookDelivery {
    /// Read topic, shop and event id from the request headers.
    ///
    /// # Errors
    ///
    /// Returns error if the topic or shop header is missing or the shop is
    /// not a valid `*.myshopify.com` domain.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, WebhookError> {
        let topic = header(headers, TOPIC_HEADER)
            .ok_or(WebhookError::MissingHeader(TOPIC_HEADER))?
            .parse::<WebhookTopic>()
            .unwrap_or_else(|never| match never {});
        let shop = ShopDomain::parse(
            header(headers, SHOP_DOMAIN_HEADER)
                .ok_or(WebhookError::MissingHeader(SHOP_DOMAIN_HEADER))?,
        )?;
        let event_id = header(headers, EVENT_ID_HEADER).map(str::to_string);

        Ok(Self {
            topic,
            shop,
            event_id,
        })
    }
}

/// A non-blank header value.
pub(crate) fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::{HeaderName, HeaderValue};

    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(
                HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_static(value),
            );
        }
        map
    }

    #[test]
    fn test_from_headers() {
        let delivery = WebhookDelivery::from_headers(&headers(&[
            (TOPIC_HEADER, "products/update"),
            (SHOP_DOMAIN_HEADER, "demo.myshopify.com"),
            (EVENT_ID_HEADER, "evt-1"),
        ]))
        .unwrap();

        assert_eq!(delivery.topic, WebhookTopic::ProductsUpdate);
        assert_eq!(delivery.shop.as_str(), "demo.myshopify.com");
        assert_eq!(delivery.event_id.as_deref(), Some("evt-1"));
    }

    #[test]
    fn test_event_id_is_optional() {
        let delivery = WebhookDelivery::from_headers(&headers(&[
            (TOPIC_HEADER, "shop/update"),
            (SHOP_DOMAIN_HEADER, "demo.myshopify.com"),
            (EVENT_ID_HEADER, "  "),
        ]))
        .unwrap();
        assert!(delivery.event_id.is_none());
    }

    #[test]
    fn test_missing_topic() {
        let err = WebhookDelivery::from_headers(&headers(&[(
            SHOP_DOMAIN_HEADER,
            "demo.myshopify.com",
        )]))
        .unwrap_err();
        assert!(matches!(err, WebhookError::MissingHeader(TOPIC_HEADER)));
    }

    #[test]
    fn test_invalid_shop() {
        let err = WebhookDelivery::from_headers(&headers(&[
            (TOPIC_HEADER, "shop/update"),
            (SHOP_DOMAIN_HEADER, "evil.example.com"),
        ]))
        .unwrap_err();
        assert!(matches!(err, WebhookError::InvalidShop(_)));
    }
}
