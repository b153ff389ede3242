mod inventory_map;
mod lock_table;

pub use inventory_map::InventoryMap;
pub use lock_table::{KeyToken, LockTable};

use crate::config::{LockGranularity, ServiceConfig};
use crate::core::{Delta, Quantity, Result, checked_apply};
use crate::store::{InventoryStore, SimulatedStore};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Inventory levels with conditional, per-key serialized updates.
///
/// An update holds its key's token across the store write. Under
/// [`LockGranularity::PerKey`] updates to different keys never wait on each
/// other; updates to the same key run one at a time, in token-acquisition
/// order.
///
/// # Examples
///
/// ```
/// use inventory_bench::{InventoryService, ServiceConfig};
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> inventory_bench::Result<()> {
/// let service = InventoryService::from_config(
///     &ServiceConfig::new().store_latency(Duration::from_millis(1)),
/// );
///
/// assert!(service.update("sku-1", 10).await?);
/// assert!(!service.update("sku-1", -11).await?);
/// assert_eq!(service.get("sku-1"), 10);
/// # Ok(())
/// # }
/// ```
pub struct InventoryService {
    inventory: InventoryMap,
    locks: LockTable,
    store: Arc<dyn InventoryStore>,
}

impl InventoryService {
    /// Create a service over an injected store
    pub fn new(store: Arc<dyn InventoryStore>, granularity: LockGranularity) -> Self {
        Self {
            inventory: InventoryMap::new(),
            locks: LockTable::new(granularity),
            store,
        }
    }

    /// Create a service backed by a [`SimulatedStore`]
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self::new(
            Arc::new(SimulatedStore::from_config(config)),
            config.lock_granularity,
        )
    }

    /// Current level for `key`, or 0 if it was never set.
    ///
    /// Does not take the key's token; a read racing an update may observe
    /// the value from before that update.
    pub fn get(&self, key: &str) -> Quantity {
        self.inventory.get(key)
    }

    /// Apply `delta` to `key`.
    ///
    /// Returns `Ok(false)` without touching the store or the map when the
    /// resulting level would be negative. A store failure is returned as an
    /// error and also leaves the map unchanged.
    pub async fn update(&self, key: &str, delta: Delta) -> Result<bool> {
        let token = self.locks.token(key);
        let _guard = token.lock().await;

        let current = self.inventory.get(key);
        let Some(next) = checked_apply(current, delta) else {
            debug!(key, current, delta, "rejected inventory update");
            return Ok(false);
        };

        self.store.apply(key, delta).await?;
        self.inventory.set(key, next);
        Ok(true)
    }

    pub fn granularity(&self) -> LockGranularity {
        self.locks.granularity()
    }

    /// Ordered copy of every stored level.
    pub fn snapshot(&self) -> BTreeMap<String, Quantity> {
        self.inventory.snapshot()
    }

    /// Number of keys with a stored level.
    pub fn key_count(&self) -> usize {
        self.inventory.len()
    }

    /// Number of lock tokens created so far.
    pub fn token_count(&self) -> usize {
        self.locks.len()
    }

    /// Sum of every stored level.
    pub fn total_quantity(&self) -> Quantity {
        self.inventory.total()
    }
}
