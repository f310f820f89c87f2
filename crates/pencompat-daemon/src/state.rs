//! Application state management

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::config::Config;
use crate::source::{Snapshot, SourceError, SourceLoader};

/// Shared application state
pub struct AppState {
    /// Loader for the configured sources
    pub loader: SourceLoader,
    /// Last successfully loaded dataset
    snapshot: RwLock<Arc<Snapshot>>,
    /// Configuration
    pub config: Config,
}

impl AppState {
    /// Create the state and perform the initial load
    pub async fn new(config: Config) -> Result<Arc<Self>> {
        let loader = SourceLoader::new(&config.dataset.sources, config.dataset.fetch_timeout_secs)?;
        let snapshot = loader.load().await?;
        Ok(Self::with_snapshot(config, loader, snapshot))
    }

    /// Create state around an already loaded snapshot
    pub fn with_snapshot(config: Config, loader: SourceLoader, snapshot: Snapshot) -> Arc<Self> {
        Arc::new(Self {
            loader,
            snapshot: RwLock::new(Arc::new(snapshot)),
            config,
        })
    }

    /// Current snapshot
    pub async fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.read().await.clone()
    }

    /// Re-fetch every source. The current snapshot is replaced only on success.
    pub async fn reload(&self) -> Result<Arc<Snapshot>, SourceError> {
        match self.loader.load().await {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                *self.snapshot.write().await = snapshot.clone();
                info!(rows = snapshot.dataset.rows.len(), "Reloaded dataset");
                Ok(snapshot)
            }
            Err(e) => {
                warn!(error = %e, "Reload failed, keeping previous dataset");
                Err(e)
            }
        }
    }
}
