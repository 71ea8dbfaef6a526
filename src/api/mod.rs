//! HTTP API: the counter endpoint plus health, readiness and metrics.

pub mod cors;
pub mod handlers;
pub mod routes;

pub use handlers::AppState;
pub use routes::{create_router, RESERVED_PATHS};
