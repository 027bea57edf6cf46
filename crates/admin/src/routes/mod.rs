//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness check
//!
//! # Webhooks (HMAC-verified)
//! POST /webhooks               - Shopify webhook ingestion
//! POST /auth/session           - Offline session hand-off after OAuth
//!
//! # Query state
//! GET  /api/query-state        - Decode a list view's query string
//! POST /api/query-state        - Apply a state change to a URL
//! ```

pub mod api;
pub mod auth;
pub mod webhooks;

use axum::{Router, routing::get};

use crate::state::AppState;

/// Create all routes for the admin server.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .merge(webhooks::router())
        .merge(auth::router())
        .merge(api::router())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}
