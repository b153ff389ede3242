mod simulated;

pub use simulated::SimulatedStore;

use crate::core::{Delta, Result};
use async_trait::async_trait;

/// Persistence collaborator invoked by the inventory service while the
/// key's token is held.
///
/// Implementations perform no synchronization of their own; the caller
/// guarantees at most one in-flight `apply` per key.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    async fn apply(&self, key: &str, delta: Delta) -> Result<()>;
}
