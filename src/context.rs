//! Application context shared by the HTTP layer and the startup tasks.

use std::sync::Arc;

use crate::config::{Config, LISTEN_PORT};
use crate::dependency::{CacheClient, Dependency, DocumentStore};

/// Handles to both dependencies plus the listen port.
///
/// Built once at startup and cloned into every handler; clones share the
/// same dependency handles.
#[derive(Clone)]
pub struct AppContext {
    /// Document store handle.
    pub document_store: Arc<dyn Dependency>,
    /// Cache handle.
    pub cache: Arc<dyn Dependency>,
    /// Port the server listens on.
    pub port: u16,
}

impl AppContext {
    /// Create a context from explicit dependency handles.
    pub fn new(document_store: Arc<dyn Dependency>, cache: Arc<dyn Dependency>, port: u16) -> Self {
        Self {
            document_store,
            cache,
            port,
        }
    }

    /// Create a context backed by the real drivers described by `config`.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Arc::new(DocumentStore::new(config.mongodb_uri.clone())),
            Arc::new(CacheClient::new(config.redis_connection_info())),
            LISTEN_PORT,
        )
    }
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("document_store", &self.document_store.state())
            .field("cache", &self.cache.state())
            .field("port", &self.port)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency::MockDependency;

    #[test]
    fn from_config_starts_disconnected_on_fixed_port() {
        let ctx = AppContext::from_config(&Config::default());

        assert_eq!(ctx.port, 4000);
        assert_eq!(ctx.document_store.name(), "MongoDB");
        assert_eq!(ctx.cache.name(), "Redis");
        assert!(!ctx.document_store.is_connected());
        assert!(!ctx.cache.is_connected());
    }

    #[test]
    fn clones_share_dependency_state() {
        let mongo = Arc::new(MockDependency::new("MongoDB"));
        let ctx = AppContext::new(mongo.clone(), Arc::new(MockDependency::new("Redis")), 4000);
        let clone = ctx.clone();

        mongo.set_connected(true);

        assert!(clone.document_store.is_connected());
    }
}
