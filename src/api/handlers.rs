//! HTTP API handlers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use tracing::debug;

use crate::counter::CounterService;
use crate::metrics;

use super::cors;

/// Application state shared with handlers.
#[derive(Clone)]
pub struct AppState {
    /// Counter service holding the process-wide store handle.
    pub counter: CounterService,
    /// Whether the service is accepting traffic.
    pub ready: Arc<AtomicBool>,
    /// Prometheus handle, when a recorder is installed.
    pub prometheus: Option<PrometheusHandle>,
}

impl AppState {
    /// Create new app state around a counter service.
    pub fn new(counter: CounterService) -> Self {
        Self {
            counter,
            ready: Arc::new(AtomicBool::new(false)),
            prometheus: None,
        }
    }

    /// Attach a Prometheus handle for the `/metrics` route.
    pub fn with_prometheus(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus = Some(handle);
        self
    }

    /// Set ready state.
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// Check if ready.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

/// Successful increment body.
#[derive(Debug, Serialize)]
pub struct CountResponse {
    /// Counter value after this request's increment.
    pub count: u64,
}

/// Failed increment body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// What went wrong.
    pub error: String,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status: "ok".
    pub status: &'static str,
}

/// Readiness check response.
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    /// Whether service is ready.
    pub ready: bool,
    /// Store backend in use.
    pub backend: &'static str,
}

/// Increment handler - one atomic increment, 200 with the new count or 500.
pub async fn increment(State(state): State<AppState>) -> Response {
    match state.counter.increment_and_get().await {
        Ok(count) => (StatusCode::OK, Json(CountResponse { count })).into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: err.to_string(),
            }),
        )
            .into_response(),
    }
}

/// Preflight handler - empty 200, never touches the store.
pub async fn preflight() -> impl IntoResponse {
    debug!("Answering CORS preflight");
    metrics::inc_preflights();
    (StatusCode::OK, cors::preflight_headers())
}

/// Health check handler - always returns 200.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

/// Readiness check handler - returns 200 if ready, 503 otherwise.
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let is_ready = state.is_ready();
    let response = ReadyResponse {
        ready: is_ready,
        backend: state.counter.backend(),
    };

    if is_ready {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}

/// Prometheus scrape handler - 404 when no recorder is installed.
pub async fn prometheus(State(state): State<AppState>) -> Response {
    match &state.prometheus {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::time::Duration;

    #[test]
    fn app_state_ready_toggle() {
        let counter = CounterService::new(
            Arc::new(MemoryStore::new()),
            "site_visits",
            Duration::from_secs(1),
        );
        let state = AppState::new(counter);
        assert!(!state.is_ready());

        state.set_ready(true);
        assert!(state.is_ready());

        state.set_ready(false);
        assert!(!state.is_ready());
    }

    #[test]
    fn bodies_serialize_to_expected_shape() {
        let body = serde_json::to_value(CountResponse { count: 42 }).unwrap();
        assert_eq!(body, serde_json::json!({ "count": 42 }));

        let body = serde_json::to_value(ErrorResponse {
            error: "boom".to_string(),
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({ "error": "boom" }));
    }
}
