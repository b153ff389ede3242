// ============================================================================
// inventory_bench Library
// ============================================================================

pub mod config;
pub mod core;
pub mod load_test;
pub mod service;
pub mod store;
pub mod web;

// Re-export main types for convenience
pub use config::{
    KeyDistribution, LoadTestConfig, LockGranularity, ServerConfig, ServiceConfig, StoreMode,
};
pub use crate::core::{Delta, InventoryError, Key, Quantity, Result, UpdateRequest};
pub use load_test::{
    HttpTarget, LoadGenerator, LoadPhase, LoadProgress, LoadTestReport, UpdateTarget,
    run_load_test,
};
pub use service::{InventoryMap, InventoryService, LockTable};
pub use store::{InventoryStore, SimulatedStore};
pub use web::{AppState, build_router};
