use std::sync::Arc;

use tokio::sync::Mutex;

use ivd_core::store::DatasetStore;
use ivd_flows::{OrphanLedger, ReviewConsole};

use crate::config::ServerConfig;
use crate::sessions::SessionRegistry;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// The backend every flow reads and writes through.
    pub store: Arc<dyn DatasetStore>,
    /// Live contribution sessions.
    pub sessions: Arc<SessionRegistry>,
    /// The administrators' console. Decisions are serialised through it.
    pub console: Arc<Mutex<ReviewConsole>>,
    /// Blobs left behind by failed inserts, across all sessions.
    pub orphans: Arc<OrphanLedger>,
}

impl AppState {
    pub fn new(config: ServerConfig, store: Arc<dyn DatasetStore>) -> Self {
        let console = ReviewConsole::new(Arc::clone(&store), config.reviewer.clone());
        Self {
            config: Arc::new(config),
            store,
            sessions: Arc::new(SessionRegistry::new()),
            console: Arc::new(Mutex::new(console)),
            orphans: Arc::new(OrphanLedger::new()),
        }
    }
}
