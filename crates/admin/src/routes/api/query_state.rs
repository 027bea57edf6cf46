//! Query-state API handlers.
//!
//! `GET` decodes the request's own query string the way a list loader
//! would. `POST` replays a hook mutation against a URL and returns where the
//! browser should navigate.

use axum::{
    Json, Router,
    extract::RawQuery,
    routing::get,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use embedded_admin_core::query_state::{
    Location, MemoryNavigator, QueryOptions, QueryPairs, QueryPatch, QueryState, QueryStateHook,
    SortOrder, parse, serialize,
};

use crate::error::AppError;
use crate::state::AppState;

/// Build the query-state router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/query-state", get(decode).post(apply))
}

/// Defaults of the product list view.
#[must_use]
pub fn product_list_defaults() -> QueryPatch {
    QueryPatch::new()
        .tab("products")
        .order_by("name")
        .page_size(8)
        .order(SortOrder::Asc)
}

/// Response for decoding a query string.
#[derive(Debug, Serialize, Deserialize)]
pub struct DecodeResponse {
    pub state: QueryState,
    /// Canonical form of the decoded state.
    pub query: String,
}

/// Request for applying a mutation.
#[derive(Debug, Deserialize)]
pub struct ApplyRequest {
    /// Current location, `path?query`.
    pub url: String,
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub patch: QueryPatch,
    /// Return to the defaults instead of applying `patch`.
    #[serde(default)]
    pub reset: bool,
}

/// Response for applying a mutation.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApplyResponse {
    pub location: String,
    pub state: QueryState,
}

/// Decode the request's query string with the product list defaults.
#[instrument]
async fn decode(RawQuery(query): RawQuery) -> Json<DecodeResponse> {
    let options = QueryOptions::new();
    let pairs = QueryPairs::parse(query.as_deref().unwrap_or_default());
    let state = parse(&pairs, &options, &product_list_defaults());
    let query = serialize(&state, &options).to_query_string();

    Json(DecodeResponse { state, query })
}

/// Apply `patch` (or a reset) to `url` and return the resulting location.
#[instrument(skip(request), fields(url = %request.url, prefix = %request.prefix))]
async fn apply(Json(request): Json<ApplyRequest>) -> Result<Json<ApplyResponse>, AppError> {
    let url = request.url.trim();
    if !url.starts_with('/') {
        return Err(AppError::BadRequest(
            "url must be an absolute path".to_string(),
        ));
    }

    let navigator = MemoryNavigator::new(url);
    let options = QueryOptions::with_prefix(request.prefix);
    let mut hook = QueryStateHook::new(navigator, product_list_defaults(), &options);

    let outcome = if request.reset {
        hook.reset()
    } else {
        hook.set_multiple(request.patch)
    };
    // MemoryNavigator cannot fail.
    outcome.unwrap_or_else(|never| match never {});

    let state = hook.state().clone();
    let location: Location = hook.into_navigator().location();

    Ok(Json(ApplyResponse {
        location: location.to_string(),
        state,
    }))
}
