use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::EntityId;

/// One product line in a user's shopping cart.
///
/// A cart holds at most one line per product; adding the same product again
/// increases the line's quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: EntityId,
    pub user_id: EntityId,
    pub product_id: EntityId,
    pub quantity: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CartItem {
    /// Composite key used in logs and validation reports.
    pub fn key(&self) -> String {
        format!("{}-{}", self.user_id, self.product_id)
    }
}
