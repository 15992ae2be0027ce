//! HTTP API handlers.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use super::reporter::DependencyStatusReporter;
use crate::metrics::LatencyTimer;

/// Greeting served at `/`.
pub const GREETING: &str = "Welcome to Dockerhub, new change 111111111111!";

/// Root handler - fixed greeting regardless of dependency state.
pub async fn index() -> &'static str {
    let _timer = LatencyTimer::new("/");
    GREETING
}

/// Status handler - returns per-dependency connection state.
pub async fn status(State(reporter): State<DependencyStatusReporter>) -> impl IntoResponse {
    let _timer = LatencyTimer::new("/api/status");
    Json(reporter.status())
}

/// Health check handler - returns 200 if healthy, 503 otherwise.
pub async fn health(State(reporter): State<DependencyStatusReporter>) -> impl IntoResponse {
    let _timer = LatencyTimer::new("/health");
    let report = reporter.health();

    if report.is_healthy() {
        (StatusCode::OK, Json(report))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(report))
    }
}
