//! Dining Table Model

use serde::{Deserialize, Serialize};

/// Table occupancy status - a cached projection of whether the table has
/// an open session
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TableStatus {
    #[default]
    Free,
    Occupied,
}

/// Dining table entity
///
/// `token` is the unguessable identifier embedded in the customer-facing
/// QR-code URL. Created by staff; never mutated concurrently by guests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiningTable {
    pub id: i64,
    pub name: String,
    /// Unguessable join token (customer-facing URL)
    pub token: String,
    pub status: TableStatus,
    pub is_active: bool,
}

impl DiningTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: crate::util::snowflake_id(),
            name: name.into(),
            token: crate::util::opaque_token(),
            status: TableStatus::Free,
            is_active: true,
        }
    }
}
