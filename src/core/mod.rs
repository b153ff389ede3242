pub mod error;
pub mod types;

pub use error::{InventoryError, Result};
pub use types::{Delta, Key, Quantity, UpdateRequest, checked_apply};
