//! Prometheus metrics for the counter endpoint.
//!
//! - Increments served and store failures
//! - Preflight requests answered
//! - Store call latency

use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::debug;

// === Metric Name Constants ===

/// Successful increments counter metric name.
pub const METRIC_INCREMENTS: &str = "counter_increments_total";
/// Failed store calls counter metric name.
pub const METRIC_STORE_ERRORS: &str = "counter_store_errors_total";
/// CORS preflight counter metric name.
pub const METRIC_PREFLIGHTS: &str = "cors_preflight_total";
/// Store call latency metric name.
pub const METRIC_STORE_LATENCY: &str = "store_increment_latency_ms";

/// Initialize all metric descriptions.
/// Call this once at startup to register metrics with descriptions.
pub fn init_metrics() {
    describe_counter!(METRIC_INCREMENTS, "Total number of successful counter increments");
    describe_counter!(METRIC_STORE_ERRORS, "Total number of failed counter store calls");
    describe_counter!(METRIC_PREFLIGHTS, "Total number of CORS preflight requests answered");
    describe_histogram!(
        METRIC_STORE_LATENCY,
        "Counter store increment latency in milliseconds"
    );

    debug!("Metrics initialized");
}

/// Install the global Prometheus recorder and return a handle for rendering.
pub fn install_prometheus() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    init_metrics();
    Ok(handle)
}

/// Record store call latency, labelled by backend and outcome.
pub fn record_store_latency(start: Instant, backend: &'static str, outcome: &'static str) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_STORE_LATENCY, "backend" => backend, "outcome" => outcome).record(latency_ms);
}

/// Increment successful increments counter.
pub fn inc_increments() {
    counter!(METRIC_INCREMENTS).increment(1);
}

/// Increment store errors counter.
pub fn inc_store_errors(kind: &'static str) {
    counter!(METRIC_STORE_ERRORS, "kind" => kind).increment(1);
}

/// Increment preflight counter.
pub fn inc_preflights() {
    counter!(METRIC_PREFLIGHTS).increment(1);
}
