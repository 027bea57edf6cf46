//! Application state shared across handlers.

use std::sync::Arc;

use crate::backend::{BackendClient, BackendError};
use crate::cache::{Clock, SystemClock, WebhookCache};
use crate::config::AdminConfig;
use crate::sessions::SessionStore;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the backend client and the webhook cache.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    backend: BackendClient,
    webhook_cache: WebhookCache,
    sessions: SessionStore,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend HTTP client cannot be built.
    pub fn new(config: AdminConfig) -> Result<Self, BackendError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create application state whose webhook cache reads time from `clock`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend HTTP client cannot be built.
    pub fn with_clock(config: AdminConfig, clock: Arc<dyn Clock>) -> Result<Self, BackendError> {
        let backend = BackendClient::new(&config.backend_base_url)?;
        let webhook_cache = WebhookCache::with_clock(&config.webhook_cache, clock);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                backend,
                webhook_cache,
                sessions: SessionStore::new(),
            }),
        })
    }

    /// Get a reference to the admin configuration.
    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    /// Get a reference to the (unsigned) backend API client.
    #[must_use]
    pub fn backend(&self) -> &BackendClient {
        &self.inner.backend
    }

    /// Get a reference to the webhook idempotency cache.
    #[must_use]
    pub fn webhook_cache(&self) -> &WebhookCache {
        &self.inner.webhook_cache
    }

    /// Get a reference to the session registry.
    #[must_use]
    pub fn sessions(&self) -> &SessionStore {
        &self.inner.sessions
    }
}
