//! Offline access tokens per shop.
//!
//! Holds the token Shopify issued when the shop installed the app. Webhook
//! forwards only run for shops with a token; `app/uninstalled` drops it.

use moka::future::Cache;
use secrecy::SecretString;
use tracing::debug;

use embedded_admin_core::ShopDomain;

const MAX_SESSIONS: u64 = 10_000;

/// In-memory session registry.
#[derive(Clone)]
pub struct SessionStore {
    tokens: Cache<ShopDomain, SecretString>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("sessions", &self.tokens.entry_count())
            .finish_non_exhaustive()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            tokens: Cache::builder().max_capacity(MAX_SESSIONS).build(),
        }
    }

    /// The shop's offline access token, if it has one.
    pub async fn access_token(&self, shop: &ShopDomain) -> Option<SecretString> {
        self.tokens.get(shop).await
    }

    /// Store (or replace) the shop's offline access token.
    pub async fn insert(&self, shop: ShopDomain, token: SecretString) {
        debug!(shop = %shop, "storing offline session");
        self.tokens.insert(shop, token).await;
    }

    /// Delete every session of the shop.
    pub async fn remove_shop(&self, shop: &ShopDomain) {
        debug!(shop = %shop, "removing sessions");
        self.tokens.invalidate(shop).await;
    }
}
