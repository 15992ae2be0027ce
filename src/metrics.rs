//! Metrics for dependency connectivity and HTTP latency.
//!
//! Metrics go through the `metrics` facade. Without an installed recorder
//! every call here is a no-op.

use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use tracing::debug;

// === Metric Name Constants ===

/// Connect attempts counter metric name.
pub const METRIC_CONNECT_ATTEMPTS: &str = "dependency_connect_attempts_total";
/// Connect failures counter metric name.
pub const METRIC_CONNECT_FAILURES: &str = "dependency_connect_failures_total";
/// Successful connects counter metric name.
pub const METRIC_CONNECTED: &str = "dependency_connected_total";
/// Retry budget exhaustion counter metric name.
pub const METRIC_RETRIES_EXHAUSTED: &str = "dependency_retries_exhausted_total";
/// HTTP request latency metric name.
pub const METRIC_HTTP_REQUEST_LATENCY: &str = "http_request_latency_ms";

/// Initialize all metric descriptions.
/// Call this once at startup to register metrics with descriptions.
pub fn init_metrics() {
    describe_counter!(
        METRIC_CONNECT_ATTEMPTS,
        "Total number of dependency connect attempts"
    );
    describe_counter!(
        METRIC_CONNECT_FAILURES,
        "Total number of failed dependency connect attempts"
    );
    describe_counter!(
        METRIC_CONNECTED,
        "Total number of successful dependency connects"
    );
    describe_counter!(
        METRIC_RETRIES_EXHAUSTED,
        "Total number of retry chains that ran out of budget"
    );
    describe_histogram!(
        METRIC_HTTP_REQUEST_LATENCY,
        "HTTP request latency in milliseconds"
    );

    debug!("Metrics initialized");
}

/// Increment connect attempts for a dependency.
pub fn inc_connect_attempts(dependency: &'static str) {
    counter!(METRIC_CONNECT_ATTEMPTS, "dependency" => dependency).increment(1);
}

/// Increment connect failures for a dependency.
pub fn inc_connect_failures(dependency: &'static str) {
    counter!(METRIC_CONNECT_FAILURES, "dependency" => dependency).increment(1);
}

/// Increment successful connects for a dependency.
pub fn inc_connected(dependency: &'static str) {
    counter!(METRIC_CONNECTED, "dependency" => dependency).increment(1);
}

/// Increment retry exhaustion for a dependency.
pub fn inc_retries_exhausted(dependency: &'static str) {
    counter!(METRIC_RETRIES_EXHAUSTED, "dependency" => dependency).increment(1);
}

/// RAII guard for timing a request.
/// Records latency under the endpoint label when dropped.
pub struct LatencyTimer {
    start: Instant,
    endpoint: &'static str,
}

impl LatencyTimer {
    /// Start timing a request to `endpoint`.
    pub fn new(endpoint: &'static str) -> Self {
        Self {
            start: Instant::now(),
            endpoint,
        }
    }

    /// Get elapsed time in milliseconds (without recording).
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        histogram!(METRIC_HTTP_REQUEST_LATENCY, "endpoint" => self.endpoint)
            .record(self.elapsed_ms());
    }
}
