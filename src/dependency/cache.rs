//! Redis cache handle.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::ConnectionInfo;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

use super::{ConnectionObserver, Dependency, LoggingObserver};
use crate::error::ConnectError;

/// How often a connected cache is pinged for runtime errors.
pub const ERROR_WATCH_INTERVAL: Duration = Duration::from_secs(30);

/// Cache connection.
///
/// Connect and error notifications go to the observer. Once connected, a
/// background task pings the cache and forwards runtime errors to the
/// observer. The open flag is set when the connection manager is up and is
/// not cleared by those errors; the manager reconnects on its own.
pub struct CacheClient {
    info: ConnectionInfo,
    open: AtomicBool,
    observer: Arc<dyn ConnectionObserver>,
    watch: Mutex<Option<JoinHandle<()>>>,
}

impl CacheClient {
    /// Create an unconnected client that logs its events.
    pub fn new(info: ConnectionInfo) -> Self {
        Self::with_observer(info, Arc::new(LoggingObserver))
    }

    /// Create with a custom observer.
    pub fn with_observer(info: ConnectionInfo, observer: Arc<dyn ConnectionObserver>) -> Self {
        Self {
            info,
            open: AtomicBool::new(false),
            observer,
            watch: Mutex::new(None),
        }
    }

    /// Address and credentials this client targets.
    pub fn connection_info(&self) -> &ConnectionInfo {
        &self.info
    }

    async fn open_manager(&self) -> Result<ConnectionManager, ConnectError> {
        let client = redis::Client::open(self.info.clone())?;
        // One attempt only; the manager would otherwise back off internally.
        let config = ConnectionManagerConfig::new().set_number_of_retries(0);
        Ok(client.get_connection_manager_with_config(config).await?)
    }

    fn start_error_watch(&self, manager: ConnectionManager) {
        let ping = move || {
            let mut manager = manager.clone();
            async move {
                let _: String = redis::cmd("PING").query_async(&mut manager).await?;
                Ok::<(), ConnectError>(())
            }
        };
        let handle = tokio::spawn(watch_errors(
            self.name(),
            self.observer.clone(),
            ERROR_WATCH_INTERVAL,
            ping,
        ));

        if let Ok(mut watch) = self.watch.lock() {
            if let Some(previous) = watch.replace(handle) {
                previous.abort();
            }
        }
    }
}

/// Ping every `period` and report failures to `observer` until aborted.
async fn watch_errors<F, Fut>(
    dependency: &'static str,
    observer: Arc<dyn ConnectionObserver>,
    period: Duration,
    mut ping: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), ConnectError>>,
{
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        match ping().await {
            Ok(()) => debug!(dependency, "{} ping ok", dependency),
            Err(e) => observer.on_error(dependency, &e),
        }
    }
}

impl std::fmt::Debug for CacheClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheClient")
            .field("addr", &self.info.addr)
            .field("open", &self.is_connected())
            .finish()
    }
}

#[async_trait]
impl Dependency for CacheClient {
    fn name(&self) -> &'static str {
        "Redis"
    }

    async fn connect(&self) -> Result<(), ConnectError> {
        match self.open_manager().await {
            Ok(manager) => {
                self.open.store(true, Ordering::SeqCst);
                self.observer.on_connected(self.name());
                self.start_error_watch(manager);
                Ok(())
            }
            Err(e) => {
                self.observer.on_error(self.name(), &e);
                Err(e)
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    async fn shutdown(&self) {
        let handle = self.watch.lock().ok().and_then(|mut watch| watch.take());
        if let Some(handle) = handle {
            handle.abort();
        }
    }
}
