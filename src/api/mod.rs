//! HTTP API module for the greeting, status, and health endpoints.

pub mod handlers;
pub mod reporter;
pub mod routes;

pub use reporter::{DependencyStatusReporter, HealthReport, HealthStatus, StatusReport};
pub use routes::create_router;
