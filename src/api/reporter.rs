//! Point-in-time dependency status snapshots.

use serde::Serialize;

use crate::context::AppContext;
use crate::dependency::ConnectionState;

/// Service name reported by the status endpoint.
pub const APP_NAME: &str = "Express Server";

/// Overall health label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Both dependencies connected.
    Healthy,
    /// At least one dependency disconnected.
    Degraded,
}

/// Status record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    /// Service name.
    pub app: &'static str,
    /// Document store state.
    pub mongodb: ConnectionState,
    /// Cache state.
    pub redis: ConnectionState,
    /// Listen port.
    pub port: u16,
}

/// Health record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    /// Overall status.
    pub status: HealthStatus,
    /// Document store state.
    pub mongodb: ConnectionState,
    /// Cache state.
    pub redis: ConnectionState,
}

impl HealthReport {
    /// Whether both dependencies are connected.
    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}

/// Reads both connection flags at call time. Never cached.
#[derive(Debug, Clone)]
pub struct DependencyStatusReporter {
    ctx: AppContext,
}

impl DependencyStatusReporter {
    /// Create a reporter over `ctx`.
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }

    /// Current status record.
    pub fn status(&self) -> StatusReport {
        StatusReport {
            app: APP_NAME,
            mongodb: self.ctx.document_store.state(),
            redis: self.ctx.cache.state(),
            port: self.ctx.port,
        }
    }

    /// Current health record.
    pub fn health(&self) -> HealthReport {
        let mongodb = self.ctx.document_store.state();
        let redis = self.ctx.cache.state();

        let status = if mongodb.is_connected() && redis.is_connected() {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        };

        HealthReport {
            status,
            mongodb,
            redis,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency::MockDependency;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn reporter(mongo: bool, redis: bool) -> DependencyStatusReporter {
        DependencyStatusReporter::new(AppContext::new(
            Arc::new(MockDependency::with_state("MongoDB", mongo)),
            Arc::new(MockDependency::with_state("Redis", redis)),
            4000,
        ))
    }

    #[test]
    fn health_requires_both_dependencies() {
        assert!(reporter(true, true).health().is_healthy());
        assert!(!reporter(true, false).health().is_healthy());
        assert!(!reporter(false, true).health().is_healthy());
        assert!(!reporter(false, false).health().is_healthy());
    }

    #[test]
    fn status_mirrors_flags() {
        let report = reporter(false, true).status();

        assert_eq!(
            report,
            StatusReport {
                app: "Express Server",
                mongodb: ConnectionState::Disconnected,
                redis: ConnectionState::Connected,
                port: 4000,
            }
        );
    }

    #[test]
    fn reads_live_state_on_every_call() {
        let mongo = Arc::new(MockDependency::new("MongoDB"));
        let redis = Arc::new(MockDependency::new("Redis"));
        let reporter =
            DependencyStatusReporter::new(AppContext::new(mongo.clone(), redis.clone(), 4000));

        assert_eq!(reporter.health().status, HealthStatus::Degraded);

        mongo.set_connected(true);
        redis.set_connected(true);
        assert_eq!(reporter.health().status, HealthStatus::Healthy);

        redis.set_connected(false);
        assert_eq!(reporter.health().status, HealthStatus::Degraded);
        assert_eq!(reporter.status().mongodb, ConnectionState::Connected);
    }

    #[test]
    fn health_serializes_to_expected_json() {
        let json = serde_json::to_value(reporter(true, false).health()).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "status": "degraded",
                "mongodb": "connected",
                "redis": "disconnected",
            })
        );
    }
}
