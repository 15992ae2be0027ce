//! MongoDB document store handle.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use mongodb::bson::doc;
use mongodb::event::sdam::SdamEvent;
use mongodb::event::EventHandler;
use mongodb::options::ClientOptions;
use mongodb::Client;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::Dependency;
use crate::error::ConnectError;

const APP_NAME: &str = "dependency-status";

/// Connected flag driven by the driver's topology events.
///
/// Every client built by [`DocumentStore::connect`] gets its own generation;
/// events from clients of earlier generations are ignored.
#[derive(Debug, Clone, Default)]
struct TopologyTracker {
    connected: Arc<AtomicBool>,
    generation: Arc<AtomicU64>,
}

impl TopologyTracker {
    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Record whether the topology of client `generation` has a writable server.
    fn record(&self, generation: u64, writable: bool) {
        if self.generation.load(Ordering::SeqCst) != generation {
            return;
        }

        let was = self.connected.swap(writable, Ordering::SeqCst);
        match (was, writable) {
            (false, true) => info!("MongoDB topology has a writable server"),
            (true, false) => warn!("MongoDB lost its writable server"),
            _ => {}
        }
    }

    /// Drop a failed client's generation so its late events cannot flip the flag.
    fn retire(&self, generation: u64) {
        if self
            .generation
            .compare_exchange(generation, generation + 1, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            self.connected.store(false, Ordering::SeqCst);
        }
    }

    fn handler(&self, generation: u64) -> EventHandler<SdamEvent> {
        let tracker = self.clone();
        EventHandler::callback(move |event: SdamEvent| {
            if let SdamEvent::TopologyDescriptionChanged(change) = event {
                tracker.record(generation, change.new_description.has_writable_server());
            }
        })
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

/// Document store connection.
///
/// A successful `ping` ends the connect attempt. From then on the connected
/// flag follows the driver's topology: it drops when no writable server is
/// left and comes back when one reappears.
#[derive(Debug)]
pub struct DocumentStore {
    uri: String,
    tracker: TopologyTracker,
    client: RwLock<Option<Client>>,
}

impl DocumentStore {
    /// Create an unconnected handle for `uri`.
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            tracker: TopologyTracker::default(),
            client: RwLock::new(None),
        }
    }

    async fn client_options(&self, generation: u64) -> Result<ClientOptions, ConnectError> {
        let mut options = ClientOptions::parse(self.uri.as_str()).await?;
        options.app_name = Some(APP_NAME.to_string());
        options.sdam_event_handler = Some(self.tracker.handler(generation));
        Ok(options)
    }

    async fn open_client(&self, generation: u64) -> Result<Client, ConnectError> {
        let client = Client::with_options(self.client_options(generation).await?)?;
        client.database("admin").run_command(doc! { "ping": 1 }).await?;
        debug!("MongoDB ping succeeded");
        Ok(client)
    }
}

#[async_trait]
impl Dependency for DocumentStore {
    fn name(&self) -> &'static str {
        "MongoDB"
    }

    async fn connect(&self) -> Result<(), ConnectError> {
        let generation = self.tracker.next_generation();

        match self.open_client(generation).await {
            Ok(client) => {
                self.tracker.record(generation, true);
                *self.client.write().await = Some(client);
                Ok(())
            }
            Err(e) => {
                // A reachable server that rejects the ping (auth) must not
                // leave the flag set.
                self.tracker.retire(generation);
                Err(e)
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.tracker.is_connected()
    }

    async fn shutdown(&self) {
        let client = self.client.write().await.take();
        if let Some(client) = client {
            client.shutdown().await;
            debug!("MongoDB client shut down");
        }
    }
}
