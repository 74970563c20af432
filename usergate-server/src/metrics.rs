//! Prometheus metrics collection for the usergate server

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::time::Instant;
use usergate_core::{Operation, Rejection};

/// Initialize all metric descriptions
pub fn init_metrics() {
    // Counters
    describe_counter!("usergate_requests_total", "Total number of dispatched user requests");
    describe_counter!("usergate_auth_rejections_total", "Total number of requests turned away by the gate");
    describe_counter!("usergate_errors_total", "Total number of error responses");

    // Histograms
    describe_histogram!("usergate_request_latency_seconds", "User handler latency in seconds");

    // Gauges
    describe_gauge!("usergate_users", "Number of stored users");
}

/// Record a completed user request
pub fn record_request(operation: Operation, latency_seconds: f64) {
    counter!("usergate_requests_total", "operation" => operation.as_str()).increment(1);
    histogram!("usergate_request_latency_seconds", "operation" => operation.as_str()).record(latency_seconds);
}

/// Record a gate rejection
pub fn record_rejection(rejection: Rejection) {
    counter!("usergate_auth_rejections_total", "reason" => rejection.as_str()).increment(1);
}

/// Record an error response
pub fn record_error(error_type: &str) {
    counter!("usergate_errors_total", "type" => error_type.to_string()).increment(1);
}

/// Update the stored user gauge
pub fn set_user_count(count: usize) {
    gauge!("usergate_users").set(count as f64);
}

/// Timer for measuring handler latency
///
/// The request is recorded when the timer is dropped, so handlers that
/// return early with an error are counted too.
pub struct RequestTimer {
    start: Instant,
    operation: Operation,
}

impl RequestTimer {
    /// Start timing an operation
    pub fn start(operation: Operation) -> Self {
        Self {
            start: Instant::now(),
            operation,
        }
    }
}

impl Drop for RequestTimer {
    fn drop(&mut self) {
        record_request(self.operation, self.start.elapsed().as_secs_f64());
    }
}

/// Storage for Prometheus handle
static PROMETHEUS_HANDLE: std::sync::OnceLock<metrics_exporter_prometheus::PrometheusHandle> =
    std::sync::OnceLock::new();

/// Initialize Prometheus exporter and store the handle
pub fn init_prometheus() -> anyhow::Result<()> {
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let handle = builder.install_recorder()?;
    PROMETHEUS_HANDLE
        .set(handle)
        .map_err(|_| anyhow::anyhow!("Failed to set Prometheus handle"))?;
    Ok(())
}

/// Get Prometheus metrics string
pub fn get_prometheus_metrics() -> String {
    PROMETHEUS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Prometheus metrics not initialized\n".to_string())
}
