use crate::core::Quantity;
use dashmap::DashMap;
use std::collections::BTreeMap;

/// Key → quantity. Absent keys read as zero.
///
/// Reads never wait on key tokens; writes are only issued by the service
/// while it holds the key's token.
#[derive(Debug, Default)]
pub struct InventoryMap {
    levels: DashMap<String, Quantity>,
}

impl InventoryMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Quantity {
        self.levels.get(key).map(|level| *level.value()).unwrap_or(0)
    }

    pub(crate) fn set(&self, key: &str, quantity: Quantity) {
        debug_assert!(quantity >= 0, "inventory level must never be negative");
        self.levels.insert(key.to_string(), quantity);
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Point-in-time copy, ordered by key.
    pub fn snapshot(&self) -> BTreeMap<String, Quantity> {
        self.levels
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect()
    }

    /// Sum of all quantities.
    pub fn total(&self) -> Quantity {
        self.levels.iter().map(|entry| *entry.value()).sum()
    }
}
