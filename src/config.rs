use crate::core::{Delta, InventoryError, Key, Result};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_STORE_LATENCY: Duration = Duration::from_millis(100);
pub const DEFAULT_REQUEST_COUNT: usize = 10_000;
pub const DEFAULT_KEY_COUNT: usize = 1_000;

/// Scope of the exclusive-access token taken by an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockGranularity {
    /// One token shared by every key.
    Global,
    /// One token per key, created on first use.
    #[default]
    PerKey,
}

impl FromStr for LockGranularity {
    type Err = String;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        match raw.to_ascii_lowercase().as_str() {
            "global" | "single" => Ok(Self::Global),
            "per-key" | "per_key" | "perkey" | "key" => Ok(Self::PerKey),
            other => Err(format!(
                "unknown lock granularity '{}', expected one of: global, per-key",
                other
            )),
        }
    }
}

impl fmt::Display for LockGranularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => write!(f, "global"),
            Self::PerKey => write!(f, "per-key"),
        }
    }
}

/// How the simulated store spends its latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreMode {
    /// Suspends the calling task; the worker thread is free to run others.
    #[default]
    Yielding,
    /// Blocks the worker thread for the full latency.
    Pinning,
}

impl FromStr for StoreMode {
    type Err = String;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        match raw.to_ascii_lowercase().as_str() {
            "yielding" | "yield" | "async" => Ok(Self::Yielding),
            "pinning" | "pin" | "blocking" => Ok(Self::Pinning),
            other => Err(format!(
                "unknown store mode '{}', expected one of: yielding, pinning",
                other
            )),
        }
    }
}

impl fmt::Display for StoreMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Yielding => write!(f, "yielding"),
            Self::Pinning => write!(f, "pinning"),
        }
    }
}

/// Inventory service configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Time each store write occupies its caller
    pub store_latency: Duration,

    /// Whether a store write suspends the task or blocks the thread
    pub store_mode: StoreMode,

    /// Lock scope used by updates
    pub lock_granularity: LockGranularity,
}

impl ServiceConfig {
    pub fn new() -> Self {
        Self {
            store_latency: DEFAULT_STORE_LATENCY,
            store_mode: StoreMode::default(),
            lock_granularity: LockGranularity::default(),
        }
    }

    /// Set the simulated store latency
    pub fn store_latency(mut self, latency: Duration) -> Self {
        self.store_latency = latency;
        self
    }

    /// Set the store mode
    pub fn store_mode(mut self, mode: StoreMode) -> Self {
        self.store_mode = mode;
        self
    }

    /// Set the lock granularity
    pub fn lock_granularity(mut self, granularity: LockGranularity) -> Self {
        self.lock_granularity = granularity;
        self
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Which keys the load generator spreads its updates over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyDistribution {
    /// Every update targets the same key.
    Fixed(Key),
    /// Update `i` targets key `1 + i % key_count`.
    RoundRobin { key_count: usize },
    /// Each update draws a key uniformly from `1..=key_count`.
    Random { key_count: usize, seed: Option<u64> },
}

impl KeyDistribution {
    /// Upper bound on distinct keys this distribution can produce.
    pub fn key_space(&self) -> usize {
        match self {
            Self::Fixed(_) => 1,
            Self::RoundRobin { key_count } | Self::Random { key_count, .. } => *key_count,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Fixed(_) => "fixed",
            Self::RoundRobin { .. } => "round-robin",
            Self::Random { .. } => "random",
        }
    }
}

impl Default for KeyDistribution {
    fn default() -> Self {
        Self::RoundRobin {
            key_count: DEFAULT_KEY_COUNT,
        }
    }
}

/// Load generator configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTestConfig {
    /// Number of update operations to launch
    pub request_count: usize,

    /// Key selection strategy
    pub distribution: KeyDistribution,

    /// Delta applied by every operation
    pub delta: Delta,

    /// Maximum in-flight operations (None = launch everything at once)
    pub concurrency_limit: Option<usize>,

    /// Wait budget before the batch is declared stalled
    pub max_wait: Option<Duration>,

    /// Maximum number of latency samples kept for percentiles
    pub sample_max: usize,
}

impl LoadTestConfig {
    pub fn new(request_count: usize, distribution: KeyDistribution) -> Self {
        Self {
            request_count,
            distribution,
            delta: 1,
            concurrency_limit: None,
            max_wait: None,
            sample_max: 100_000,
        }
    }

    /// Set the per-operation delta
    pub fn delta(mut self, delta: Delta) -> Self {
        self.delta = delta;
        self
    }

    /// Cap the number of in-flight operations
    pub fn concurrency_limit(mut self, limit: usize) -> Self {
        self.concurrency_limit = Some(limit);
        self
    }

    /// Set the stall deadline
    pub fn max_wait(mut self, wait: Duration) -> Self {
        self.max_wait = Some(wait);
        self
    }

    /// Set the latency sample cap
    pub fn sample_max(mut self, max: usize) -> Self {
        self.sample_max = max;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.request_count == 0 {
            return Err("request_count must be > 0".to_string());
        }

        match &self.distribution {
            KeyDistribution::Fixed(key) if key.is_empty() => {
                return Err("fixed key cannot be empty".to_string());
            }
            KeyDistribution::RoundRobin { key_count } | KeyDistribution::Random { key_count, .. }
                if *key_count == 0 =>
            {
                return Err("key_count must be > 0".to_string());
            }
            _ => {}
        }

        if self.concurrency_limit == Some(0) {
            return Err("concurrency_limit must be > 0".to_string());
        }

        Ok(())
    }
}

impl Default for LoadTestConfig {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_COUNT, KeyDistribution::default())
    }
}

/// HTTP server configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub service: ServiceConfig,
    /// Keys `POST /inventory/random-update` chooses from
    pub random_key_pool: Vec<Key>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let host = env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .map_err(|_| InventoryError::Config("APP_PORT must be a valid u16".to_string()))?;

        let latency_ms = env::var("STORE_LATENCY_MS")
            .unwrap_or_else(|_| DEFAULT_STORE_LATENCY.as_millis().to_string())
            .parse::<u64>()
            .map_err(|_| {
                InventoryError::Config("STORE_LATENCY_MS must be a valid u64".to_string())
            })?;

        let lock_granularity = env::var("LOCK_GRANULARITY")
            .ok()
            .map(|raw| raw.parse::<LockGranularity>())
            .transpose()
            .map_err(InventoryError::Config)?
            .unwrap_or_default();

        let store_mode = env::var("STORE_MODE")
            .ok()
            .map(|raw| raw.parse::<StoreMode>())
            .transpose()
            .map_err(InventoryError::Config)?
            .unwrap_or_default();

        let random_key_pool = env::var("RANDOM_KEY_POOL")
            .map(|raw| parse_key_pool(&raw))
            .unwrap_or_else(|_| default_key_pool());

        let config = Self {
            host,
            port,
            service: ServiceConfig::new()
                .store_latency(Duration::from_millis(latency_ms))
                .store_mode(store_mode)
                .lock_granularity(lock_granularity),
            random_key_pool,
        };
        config.validate().map_err(InventoryError::Config)?;
        Ok(config)
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.random_key_pool.is_empty() {
            return Err("RANDOM_KEY_POOL must contain at least one key".to_string());
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            service: ServiceConfig::default(),
            random_key_pool: default_key_pool(),
        }
    }
}

fn default_key_pool() -> Vec<Key> {
    vec!["1".to_string(), "2".to_string(), "3".to_string()]
}

fn parse_key_pool(raw: &str) -> Vec<Key> {
    raw.split(',')
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_string)
        .collect()
}
