//! Unified error types for the status server.

use thiserror::Error;

/// Top-level error type for startup and configuration.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Configuration loaded but failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error (listener bind, serve).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of a single dependency connect attempt.
#[derive(Error, Debug)]
pub enum ConnectError {
    /// Document store driver error (URI parse, server selection, ping).
    #[error("{0}")]
    DocumentStore(#[from] mongodb::error::Error),

    /// Cache driver error.
    #[error("{0}")]
    Cache(#[from] redis::RedisError),

    /// Dependency unavailable for a reason not tied to a driver.
    #[error("dependency unavailable: {0}")]
    Unavailable(String),
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, AppError>;
