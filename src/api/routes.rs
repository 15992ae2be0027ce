//! HTTP API route definitions.

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use super::handlers::{health, index, status};
use super::reporter::DependencyStatusReporter;
use crate::context::AppContext;

/// Create the API router.
pub fn create_router(ctx: AppContext) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/status", get(status))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(DependencyStatusReporter::new(ctx))
}
