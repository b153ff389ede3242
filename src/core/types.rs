use serde::{Deserialize, Serialize};

/// Product identifier.
pub type Key = String;

/// Stock count for a key. Never negative once stored.
pub type Quantity = i64;

/// Signed change applied to a quantity.
pub type Delta = i64;

/// Body of an inventory update call.
///
/// Positive values add stock, negative values remove it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    pub quantity_change: Delta,
}

impl UpdateRequest {
    pub fn new(quantity_change: Delta) -> Self {
        Self { quantity_change }
    }
}

/// Applies `delta` to `current`, or `None` when the result would be negative
/// or overflow.
pub fn checked_apply(current: Quantity, delta: Delta) -> Option<Quantity> {
    current.checked_add(delta).filter(|next| *next >= 0)
}
