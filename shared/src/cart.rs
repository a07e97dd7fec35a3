//! Cart line types
//!
//! A cart line is an unsubmitted, guest-owned candidate order item. Lines
//! are partitioned by owning guest, which removes cross-device write-write
//! races by construction: only the owning guest's device writes its lines.

use serde::{Deserialize, Serialize};

/// Structured add-on and observation metadata attached to a cart line
///
/// Two lines for the same product are the same line for increment/decrement
/// purposes only when their details are identical; differing add-ons or
/// observations make distinct lines.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct LineDetail {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addon_ids: Vec<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addon_names: Vec<String>,
    #[serde(default)]
    pub addon_total_cents: i64,
    /// Free-text customer observation ("sem cebola")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observation: Option<String>,
}

impl LineDetail {
    /// A detail carrying nothing collapses to "no detail"
    pub fn is_empty(&self) -> bool {
        self.addon_ids.is_empty()
            && self.addon_names.is_empty()
            && self.addon_total_cents == 0
            && self.observation.as_deref().is_none_or(|o| o.trim().is_empty())
    }
}

/// Cart line entity
///
/// Destroyed on submission (captured as an Order Item) or explicit removal.
/// A line whose quantity would become <= 0 is deleted, never stored at zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    pub id: i64,
    pub session_id: i64,
    /// Owning guest - only this guest (or logic acting on their behalf)
    /// may mutate the line
    pub guest_id: i64,
    pub product_id: i64,
    pub qty: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<LineDetail>,
    pub created_at: i64,
}

impl CartLine {
    pub fn new(
        session_id: i64,
        guest_id: i64,
        product_id: i64,
        qty: i64,
        detail: Option<LineDetail>,
    ) -> Self {
        Self {
            id: crate::util::snowflake_id(),
            session_id,
            guest_id,
            product_id,
            qty,
            // Empty details are normalized away so merge keys stay canonical
            detail: detail.filter(|d| !d.is_empty()),
            created_at: crate::util::now_millis(),
        }
    }

    /// Whether another (product, detail) pair identifies this same line
    pub fn matches(&self, product_id: i64, detail: Option<&LineDetail>) -> bool {
        self.product_id == product_id && self.detail.as_ref() == detail.filter(|d| !d.is_empty())
    }
}
