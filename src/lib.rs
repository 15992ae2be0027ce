//! HTTP status server for a MongoDB + Redis deployment.
//!
//! The server starts listening immediately, connects to its two backing
//! stores in the background, and reports their connection state:
//!
//! ```text
//! GET /            greeting
//! GET /api/status  { app, mongodb, redis, port }
//! GET /health      { status, mongodb, redis }   200 healthy / 503 degraded
//! ```
//!
//! MongoDB connects through a bounded retry chain with capped exponential
//! backoff. Redis gets a single attempt.
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`dependency`]: Backing-store handles and connection state
//! - [`retry`]: Bounded connection retries
//! - [`context`]: Application context holding both dependencies
//! - [`api`]: HTTP routes and status reporting
//! - [`startup`]: Listener and background connect wiring
//! - [`metrics`]: Connectivity and latency metrics
//! - [`utils`]: Utility functions

pub mod api;
pub mod config;
pub mod context;
pub mod dependency;
pub mod error;
pub mod metrics;
pub mod retry;
pub mod startup;
pub mod utils;

pub use config::Config;
pub use context::AppContext;
pub use error::{AppError, Result};
