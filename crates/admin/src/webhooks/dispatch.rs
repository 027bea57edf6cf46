//! Forwarding shop events to the backend.

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error, info, info_span, instrument, warn};

use embedded_admin_core::{ShopDomain, WebhookTopic};

use crate::backend::{ApiResponse, BackendClient, ResponseCode};
use crate::state::AppState;

use super::WebhookDelivery;
use super::signature::sign_shop;

pub const SHOP_PATH: &str = "/shop";
pub const APP_UNINSTALLED_PATH: &str = "/webhooks/app/uninstalled";
pub const SHOP_UPDATE_PATH: &str = "/webhooks/shop/update";
pub const PRODUCTS_SYNC_PATH: &str = "/webhooks/products/sync";

#[derive(Serialize)]
struct DomainBody<'a> {
    domain: &'a str,
}

#[derive(Serialize)]
struct ShopBody<'a> {
    domain: &'a str,
    token: &'a str,
}

#[derive(Serialize)]
struct ProductsSyncBody<'a> {
    topic: &'a str,
    domain: &'a str,
    token: &'a str,
    // Always `{}`: the backend re-syncs the whole catalogue.
    payload: Value,
}

/// What happened to one delivery.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// A backend call was made (or attempted); see the folded response.
    Forwarded(ApiResponse<Value>),
    /// The shop has no offline session, so there is nothing to forward.
    NoSession,
    /// Mandatory privacy topic, acknowledged only.
    Compliance,
    /// A topic this app does not handle.
    Unhandled,
}

/// Handle one verified, de-duplicated delivery.
pub async fn dispatch(state: &AppState, topic: &WebhookTopic, shop: &ShopDomain) -> DispatchOutcome {
    if topic.is_compliance() {
        debug!(topic = %topic, shop = %shop, "compliance webhook acknowledged");
        return DispatchOutcome::Compliance;
    }
    if !topic.is_signed_forward() {
        warn!(topic = %topic, shop = %shop, "received unhandled webhook topic");
        return DispatchOutcome::Unhandled;
    }

    let Some(token) = state.sessions().access_token(shop).await else {
        debug!(topic = %topic, shop = %shop, "no offline session, skipping forward");
        return DispatchOutcome::NoSession;
    };

    let backend = match signed_backend(state, shop) {
        Ok(backend) => backend,
        Err(response) => return DispatchOutcome::Forwarded(response),
    };

    let response: ApiResponse<Value> = match topic {
        WebhookTopic::AppUninstalled => {
            state.sessions().remove_shop(shop).await;
            backend
                .post(
                    APP_UNINSTALLED_PATH,
                    &DomainBody {
                        domain: shop.as_str(),
                    },
                )
                .await
        }
        WebhookTopic::ShopUpdate => {
            backend
                .post(
                    SHOP_UPDATE_PATH,
                    &ShopBody {
                        domain: shop.as_str(),
                        token: token.expose_secret(),
                    },
                )
                .await
        }
        _ => {
            backend
                .post(
                    PRODUCTS_SYNC_PATH,
                    &ProductsSyncBody {
                        topic: topic.as_str(),
                        domain: shop.as_str(),
                        token: token.expose_secret(),
                        payload: Value::Object(serde_json::Map::new()),
                    },
                )
                .await
        }
    };

    if response.is_success() {
        info!(topic = %topic, shop = %shop, "webhook forwarded to backend");
    } else {
        error!(
            topic = %topic,
            shop = %shop,
            status_code = %response.status_code,
            message = %response.message,
            "backend rejected webhook forward"
        );
    }

    DispatchOutcome::Forwarded(response)
}

/// Run [`dispatch`] in a detached task.
///
/// The caller may drop the handle; the task keeps running.
pub fn spawn_dispatch(state: AppState, delivery: WebhookDelivery) -> JoinHandle<DispatchOutcome> {
    let span = info_span!(
        "webhook_dispatch",
        topic = %delivery.topic,
        shop = %delivery.shop,
    );
    tokio::spawn(
        async move { dispatch(&state, &delivery.topic, &delivery.shop).await }.instrument(span),
    )
}

/// Register a freshly installed shop.
///
/// Stores the offline token and posts `{domain, token}` to `/shop`.
#[instrument(skip(state, shop, token), fields(shop = %shop))]
pub async fn after_auth(state: &AppState, shop: ShopDomain, token: SecretString) -> ApiResponse<Value> {
    state.sessions().insert(shop.clone(), token.clone()).await;

    let backend = match signed_backend(state, &shop) {
        Ok(backend) => backend,
        Err(response) => return response,
    };

    let response = backend
        .post(
            SHOP_PATH,
            &ShopBody {
                domain: shop.as_str(),
                token: token.expose_secret(),
            },
        )
        .await;

    if response.is_success() {
        info!("shop registered with backend");
    } else {
        error!(
            status_code = %response.status_code,
            message = %response.message,
            "shop registration failed"
        );
    }
    response
}

/// A backend handle carrying the shop's HMAC header.
fn signed_backend(state: &AppState, shop: &ShopDomain) -> Result<BackendClient, ApiResponse<Value>> {
    sign_shop(&state.config().shopify.api_secret, shop)
        .map_err(|e| e.to_string())
        .and_then(|hmac| state.backend().with_hmac(&hmac).map_err(|e| e.to_string()))
        .map_err(|message| {
            error!(shop = %shop, error = %message, "failed to sign backend request");
            ApiResponse::failure(ResponseCode::INTERNAL_SERVER_ERROR, message)
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use url::Url;

    use super::*;
    use crate::config::{AdminConfig, ShopifyAppConfig};

    fn state() -> AppState {
        let config = AdminConfig::new(
            ShopifyAppConfig {
                api_key: "client-id".to_string(),
                api_secret: SecretString::from("hush"),
            },
            Url::parse("http://127.0.0.1:9").unwrap(),
        );
        AppState::new(config).unwrap()
    }

    fn shop() -> ShopDomain {
        ShopDomain::parse("demo.myshopify.com").unwrap()
    }

    #[tokio::test]
    async fn test_compliance_topics_are_acknowledged() {
        let state = state();
        state.sessions().insert(shop(), SecretString::from("shpat_x")).await;

        for topic in [
            WebhookTopic::CustomersDataRequest,
            WebhookTopic::CustomersRedact,
            WebhookTopic::ShopRedact,
        ] {
            assert_eq!(dispatch(&state, &topic, &shop()).await, DispatchOutcome::Compliance);
        }
    }

    #[tokio::test]
    async fn test_unknown_topic_is_unhandled() {
        let state = state();
        let topic = WebhookTopic::Other("orders/create".to_string());
        assert_eq!(dispatch(&state, &topic, &shop()).await, DispatchOutcome::Unhandled);
    }

    #[tokio::test]
    async fn test_no_session_skips_forward() {
        let state = state();
        for topic in [
            WebhookTopic::AppUninstalled,
            WebhookTopic::ShopUpdate,
            WebhookTopic::ProductsUpdate,
            WebhookTopic::ProductsDelete,
        ] {
            assert_eq!(dispatch(&state, &topic, &shop()).await, DispatchOutcome::NoSession);
        }
    }

    #[tokio::test]
    async fn test_uninstall_removes_session_even_if_backend_is_down() {
        let state = state();
        state.sessions().insert(shop(), SecretString::from("shpat_x")).await;

        let outcome = dispatch(&state, &WebhookTopic::AppUninstalled, &shop()).await;

        assert!(matches!(outcome, DispatchOutcome::Forwarded(ref r) if !r.is_success()));
        assert!(state.sessions().access_token(&shop()).await.is_none());
    }

    #[tokio::test]
    async fn test_spawn_dispatch_returns_outcome() {
        let delivery = WebhookDelivery {
            topic: WebhookTopic::ShopRedact,
            shop: shop(),
            event_id: None,
        };
        let outcome = spawn_dispatch(state(), delivery).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Compliance);
    }
}
