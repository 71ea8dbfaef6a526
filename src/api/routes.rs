//! HTTP API route definitions.

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use super::cors::cors_headers;
use super::handlers::{health, increment, preflight, prometheus, ready, AppState};

/// Operational paths the counter endpoint may not be mounted on.
pub const RESERVED_PATHS: [&str; 3] = ["/health", "/ready", "/metrics"];

/// Create the API router with the counter endpoint mounted at `endpoint_path`.
pub fn create_router(state: AppState, endpoint_path: &str) -> Router {
    // OPTIONS is routed before POST ever reaches the store; the CORS layer
    // covers 200, 500 and 405 responses of the counter route alike.
    let counter = Router::new()
        .route(endpoint_path, post(increment).options(preflight))
        .layer(middleware::from_fn(cors_headers));

    Router::new()
        // Health endpoints
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/metrics", get(prometheus))
        .merge(counter)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
