use crate::config::LockGranularity;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Exclusive-access token for one key (or for every key under
/// [`LockGranularity::Global`]).
pub type KeyToken = Arc<Mutex<()>>;

/// Key → token table. Tokens are created on first use and never removed.
pub struct LockTable {
    granularity: LockGranularity,
    /// Shared by all keys in global mode; unused otherwise
    global: KeyToken,
    tokens: DashMap<String, KeyToken>,
}

impl LockTable {
    pub fn new(granularity: LockGranularity) -> Self {
        Self {
            granularity,
            global: Arc::new(Mutex::new(())),
            tokens: DashMap::new(),
        }
    }

    pub fn granularity(&self) -> LockGranularity {
        self.granularity
    }

    /// Token guarding `key`.
    ///
    /// Concurrent first calls for the same key all receive the same token:
    /// insertion goes through the shard's entry lock, so only one token is
    /// ever stored per key.
    pub fn token(&self, key: &str) -> KeyToken {
        if self.granularity == LockGranularity::Global {
            return Arc::clone(&self.global);
        }

        if let Some(existing) = self.tokens.get(key) {
            return Arc::clone(existing.value());
        }

        let entry = self.tokens.entry(key.to_string()).or_insert_with(|| {
            debug!(key, "creating lock token");
            Arc::new(Mutex::new(()))
        });
        Arc::clone(entry.value())
    }

    /// Number of per-key tokens created so far.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl Default for LockTable {
    fn default() -> Self {
        Self::new(LockGranularity::default())
    }
}
