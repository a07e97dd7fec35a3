//! Order types
//!
//! An order is an immutable-once-approved record of what was sent to the
//! kitchen. Order items are priced, named snapshots of cart lines at
//! submission time; later catalog edits never change them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fulfillment status axis
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Preparing,
    Ready,
    Finished,
    Cancelled,
}

impl OrderStatus {
    /// Terminal states admit no further fulfillment transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::Preparing => "PREPARING",
            Self::Ready => "READY",
            Self::Finished => "FINISHED",
            Self::Cancelled => "CANCELLED",
        };
        write!(f, "{s}")
    }
}

/// Approval status axis - only meaningful while fulfillment is PENDING
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalStatus {
    PendingApproval,
    Approved,
    Rejected,
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::PendingApproval => "PENDING_APPROVAL",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        };
        write!(f, "{s}")
    }
}

/// Who injected the order into the session
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderOrigin {
    Customer,
    Waiter,
    Balcao,
}

impl OrderOrigin {
    /// Staff-originated orders bypass the host approval gate
    pub fn is_staff(&self) -> bool {
        matches!(self, Self::Waiter | Self::Balcao)
    }
}

/// Order item - a priced, named snapshot of a cart line at submission time
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    pub product_id: i64,
    /// Product name frozen at submission
    pub name_snapshot: String,
    /// Unit price in cents, promotion and add-ons already resolved
    pub unit_price_cents: i64,
    pub qty: i64,
    /// Normalized free-text note (add-on names + observation)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Display name of the guest or staff member who added the line
    pub added_by_name: String,
    /// Promotion name applied at submission, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promo_name: Option<String>,
    /// Discount per unit in cents
    #[serde(default)]
    pub discount_cents: i64,
}

impl OrderItem {
    /// Line total in cents
    pub fn total_cents(&self) -> i64 {
        self.unit_price_cents * self.qty
    }
}

/// Order entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub session_id: i64,
    pub table_id: Option<i64>,
    pub origin: OrderOrigin,
    /// Links additional rounds back to the session's root order for
    /// kitchen-ticket grouping; None for the root order itself
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_order_id: Option<i64>,
    pub status: OrderStatus,
    pub approval_status: ApprovalStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by_guest_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by_profile_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_by_guest_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<i64>,
    pub items: Vec<OrderItem>,
    // Pricing, all integer cents, recomputed authoritatively at creation
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub delivery_fee_cents: i64,
    pub total_cents: i64,
    /// Idempotency guard for physical ticket reprints
    #[serde(skip_serializing_if = "Option::is_none")]
    pub printed_at: Option<i64>,
    #[serde(default)]
    pub printed_count: u32,
    pub created_at: i64,
}

impl Order {
    /// Whether any further non-print mutation is allowed
    pub fn is_immutable(&self) -> bool {
        self.status.is_terminal() || self.approval_status == ApprovalStatus::Rejected
    }

    /// Whether this order still gates its submitter's cart
    pub fn blocks_submitter(&self) -> bool {
        self.approval_status == ApprovalStatus::PendingApproval
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses() {
        assert!(OrderStatus::Finished.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(!OrderStatus::Preparing.is_terminal());
        assert!(!OrderStatus::Ready.is_terminal());
    }

    #[test]
    fn staff_origins() {
        assert!(OrderOrigin::Waiter.is_staff());
        assert!(OrderOrigin::Balcao.is_staff());
        assert!(!OrderOrigin::Customer.is_staff());
    }

    #[test]
    fn serde_uses_screaming_snake_case() {
        let json = serde_json::to_string(&ApprovalStatus::PendingApproval).unwrap();
        assert_eq!(json, "\"PENDING_APPROVAL\"");
        let json = serde_json::to_string(&OrderOrigin::Balcao).unwrap();
        assert_eq!(json, "\"BALCAO\"");
    }
}
