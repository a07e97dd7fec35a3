//! Promotion Model

use serde::{Deserialize, Serialize};

/// Promotion scope
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PromotionScope {
    Global,
    Product,
}

/// Discount type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountType {
    /// Fixed amount in cents
    Amount,
    /// Percentage of the base price, 0-100
    Percent,
}

/// Promotion entity
///
/// Write-time invariant: no two active PRODUCT-scoped promotions may share
/// both a product and a weekday (validated before creation/activation).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Promotion {
    pub id: i64,
    pub name: String,
    pub scope: PromotionScope,
    /// Target product; required when scope is PRODUCT
    pub product_id: Option<i64>,
    pub discount_type: DiscountType,
    /// Cents for AMOUNT, whole percent (0-100) for PERCENT
    pub discount_value: i64,
    /// Active weekdays, 0=Sunday .. 6=Saturday
    pub weekdays: Vec<u8>,
    pub active: bool,
}

impl Promotion {
    /// Whether this promotion applies on the given weekday (0=Sunday)
    pub fn applies_on(&self, weekday: u8) -> bool {
        self.weekdays.contains(&weekday)
    }

    /// Whether this promotion targets the given product
    pub fn targets(&self, product_id: i64) -> bool {
        self.scope == PromotionScope::Product && self.product_id == Some(product_id)
    }
}
