//! Product Model
//!
//! Catalog CRUD is out of scope; the engine only needs the fields that
//! pricing and order-item snapshotting read.

use serde::{Deserialize, Serialize};

/// Product entity (catalog projection)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    /// Base unit price in integer cents
    pub price_cents: i64,
    pub is_active: bool,
}

impl Product {
    pub fn new(name: impl Into<String>, price_cents: i64) -> Self {
        Self {
            id: crate::util::snowflake_id(),
            name: name.into(),
            price_cents,
            is_active: true,
        }
    }
}
