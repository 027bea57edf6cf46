//! JSON API route handlers for admin.

pub mod query_state;

use axum::Router;

use crate::state::AppState;

/// Build the complete API router.
pub fn router() -> Router<AppState> {
    Router::new().merge(query_state::router())
}
