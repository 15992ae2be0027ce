//! Backing-store dependencies and their connection state.
//!
//! Each dependency owns a single connection flag. Only the dependency writes
//! it; the HTTP layer only reads it, at request time.

pub mod cache;
pub mod document_store;
pub mod mock;

use async_trait::async_trait;
use serde::Serialize;
use strum::Display;
use tracing::{error, info};

use crate::error::ConnectError;

pub use cache::CacheClient;
pub use document_store::DocumentStore;
pub use mock::MockDependency;

/// Connection state as reported to HTTP clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ConnectionState {
    /// Driver reports an open connection.
    Connected,
    /// Not connected, never connected, or not initialised.
    Disconnected,
}

impl ConnectionState {
    /// Map a driver flag to a state.
    pub fn from_flag(connected: bool) -> Self {
        if connected {
            Self::Connected
        } else {
            Self::Disconnected
        }
    }

    /// Whether this is [`ConnectionState::Connected`].
    pub fn is_connected(self) -> bool {
        self == Self::Connected
    }
}

/// A backing store the server connects to at startup.
#[async_trait]
pub trait Dependency: Send + Sync {
    /// Short name used in logs and metric labels.
    fn name(&self) -> &'static str;

    /// Make one connection attempt.
    async fn connect(&self) -> Result<(), ConnectError>;

    /// Live connection flag. Never fails.
    fn is_connected(&self) -> bool;

    /// Release driver resources on process shutdown.
    async fn shutdown(&self) {}

    /// Live connection flag as a [`ConnectionState`].
    fn state(&self) -> ConnectionState {
        ConnectionState::from_flag(self.is_connected())
    }
}

/// Receives connection notifications from a driver.
pub trait ConnectionObserver: Send + Sync {
    /// The driver opened its connection.
    fn on_connected(&self, dependency: &'static str);

    /// The driver reported an error, during connect or afterwards.
    fn on_error(&self, dependency: &'static str, error: &ConnectError);
}

/// Observer that writes notifications to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingObserver;

impl ConnectionObserver for LoggingObserver {
    fn on_connected(&self, dependency: &'static str) {
        info!(dependency, "Connected to {} successfully", dependency);
    }

    fn on_error(&self, dependency: &'static str, error: &ConnectError) {
        error!(dependency, "{} connection error: {}", dependency, error);
    }
}
