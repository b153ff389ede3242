use super::InventoryStore;
use crate::config::{ServiceConfig, StoreMode};
use crate::core::{Delta, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::trace;

/// Stand-in database write: occupies its caller for a fixed latency and
/// persists nothing.
#[derive(Debug)]
pub struct SimulatedStore {
    latency: Duration,
    mode: StoreMode,
    writes: AtomicU64,
}

impl SimulatedStore {
    pub fn new(latency: Duration, mode: StoreMode) -> Self {
        Self {
            latency,
            mode,
            writes: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &ServiceConfig) -> Self {
        Self::new(config.store_latency, config.store_mode)
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }

    pub fn mode(&self) -> StoreMode {
        self.mode
    }

    /// Number of `apply` calls that have completed.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl InventoryStore for SimulatedStore {
    async fn apply(&self, key: &str, delta: Delta) -> Result<()> {
        trace!(key, delta, mode = %self.mode, "simulated store write");
        match self.mode {
            StoreMode::Yielding => tokio::time::sleep(self.latency).await,
            // Holds the worker thread, like a task pinned to its carrier.
            StoreMode::Pinning => std::thread::sleep(self.latency),
        }
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
