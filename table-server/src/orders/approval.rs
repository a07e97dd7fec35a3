//! Approval resolution
//!
//! Only the session host (or a staff actor) may resolve a
//! PENDING_APPROVAL order. Approval keeps the order PENDING on the
//! fulfillment axis (the kitchen queue) and deletes the submitter's cart
//! lines in the same transaction. Rejection is final: the order becomes
//! REJECTED + CANCELLED and the submitter's cart is left untouched so
//! nothing is resubmitted on their behalf.

use shared::order::{ApprovalStatus, Order, OrderStatus};
use shared::util::now_millis;
use shared::{FeedEventType, FeedTable};
use tracing::info;

use super::{OrderError, OrderResult, OrderService};
use crate::storage::StorageError;

impl OrderService {
    /// Approve a pending order as the session host
    pub fn approve(&self, order_id: i64, acting_guest_id: i64) -> OrderResult<Order> {
        self.check_host(order_id, acting_guest_id)?;
        self.resolve_approval(order_id, true, Some(acting_guest_id))
    }

    /// Reject a pending order as the session host
    pub fn reject(&self, order_id: i64, acting_guest_id: i64) -> OrderResult<Order> {
        self.check_host(order_id, acting_guest_id)?;
        self.resolve_approval(order_id, false, Some(acting_guest_id))
    }

    /// Resolve a pending order as staff, bypassing the host check
    pub fn resolve_as_staff(&self, order_id: i64, approve: bool) -> OrderResult<Order> {
        self.resolve_approval(order_id, approve, None)
    }

    fn check_host(&self, order_id: i64, acting_guest_id: i64) -> OrderResult<()> {
        let order = self.storage.require_order(order_id)?;
        let session = self.storage.require_session(order.session_id)?;
        if session.host_guest_id != Some(acting_guest_id) {
            return Err(OrderError::HostRequired);
        }
        Ok(())
    }

    /// The atomic resolution: re-checked and applied inside one write
    /// transaction so two resolvers cannot both win.
    fn resolve_approval(
        &self,
        order_id: i64,
        approve: bool,
        approved_by_guest_id: Option<i64>,
    ) -> OrderResult<Order> {
        let txn = self.storage.begin_write()?;
        let order = {
            let mut order = self
                .storage
                .get_order_txn(&txn, order_id)?
                .ok_or(StorageError::OrderNotFound(order_id))?;
            if order.approval_status != ApprovalStatus::PendingApproval {
                return Err(OrderError::AlreadyResolved(order_id));
            }
            if order.status.is_terminal() {
                return Err(OrderError::OrderImmutable(order_id));
            }
            if approve {
                order.approval_status = ApprovalStatus::Approved;
                order.approved_by_guest_id = approved_by_guest_id;
                order.approved_at = Some(now_millis());
                // The submitted cart is consumed by the approval
                if let Some(guest_id) = order.created_by_guest_id {
                    self.storage
                        .delete_cart_lines_for_guest_txn(&txn, order.session_id, guest_id)?;
                }
            } else {
                order.approval_status = ApprovalStatus::Rejected;
                order.status = OrderStatus::Cancelled;
            }
            self.storage.put_order_txn(&txn, &order)?;
            order
        };
        txn.commit().map_err(StorageError::from)?;
        info!(order_id, approved = approve, "approval resolved");

        self.feed
            .signal(FeedEventType::Update, FeedTable::Orders, order.session_id);
        if approve {
            self.feed
                .signal(FeedEventType::Delete, FeedTable::CartLines, order.session_id);
        }
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::tests::fixture;
    use shared::models::ApprovalMode;

    fn pending_order(fx: &crate::orders::tests::Fixture) -> Order {
        fx.carts
            .increment(fx.session_id, fx.guest_id, fx.juice.id, 1, None)
            .unwrap();
        fx.orders.submit_guest_order(fx.session_id, fx.guest_id).unwrap()
    }

    #[test]
    fn host_approval_queues_the_order_and_clears_the_cart() {
        let fx = fixture(ApprovalMode::Host);
        let order = pending_order(&fx);

        let approved = fx.orders.approve(order.id, fx.host_id).unwrap();
        assert_eq!(approved.approval_status, ApprovalStatus::Approved);
        assert_eq!(approved.status, OrderStatus::Pending);
        assert_eq!(approved.approved_by_guest_id, Some(fx.host_id));
        assert!(approved.approved_at.is_some());
        assert!(fx
            .carts
            .lines_for_guest(fx.session_id, fx.guest_id)
            .unwrap()
            .is_empty());

        // The submitter may order again
        fx.carts
            .increment(fx.session_id, fx.guest_id, fx.juice.id, 1, None)
            .unwrap();
    }

    #[test]
    fn rejection_is_final_and_leaves_the_cart_alone() {
        let fx = fixture(ApprovalMode::Host);
        let order = pending_order(&fx);

        let rejected = fx.orders.reject(order.id, fx.host_id).unwrap();
        assert_eq!(rejected.approval_status, ApprovalStatus::Rejected);
        assert_eq!(rejected.status, OrderStatus::Cancelled);
        // No cart mutation on reject
        assert_eq!(
            fx.carts.lines_for_guest(fx.session_id, fx.guest_id).unwrap().len(),
            1
        );

        // No resurrection
        let err = fx.orders.approve(rejected.id, fx.host_id).unwrap_err();
        assert!(matches!(err, OrderError::AlreadyResolved(_)));
        let err = fx
            .orders
            .transition(rejected.id, OrderStatus::Preparing)
            .unwrap_err();
        assert!(matches!(err, OrderError::OrderImmutable(_)));
    }

    #[test]
    fn non_host_guests_cannot_resolve() {
        let fx = fixture(ApprovalMode::Host);
        let order = pending_order(&fx);

        let err = fx.orders.approve(order.id, fx.guest_id).unwrap_err();
        assert!(matches!(err, OrderError::HostRequired));
        let err = fx.orders.reject(order.id, fx.guest_id).unwrap_err();
        assert!(matches!(err, OrderError::HostRequired));
    }

    #[test]
    fn staff_can_resolve_without_being_host() {
        let fx = fixture(ApprovalMode::Host);
        let order = pending_order(&fx);

        let approved = fx.orders.resolve_as_staff(order.id, true).unwrap();
        assert_eq!(approved.approval_status, ApprovalStatus::Approved);
        assert!(approved.approved_by_guest_id.is_none());
    }

    #[test]
    fn double_resolution_fails() {
        let fx = fixture(ApprovalMode::Host);
        let order = pending_order(&fx);

        fx.orders.approve(order.id, fx.host_id).unwrap();
        let err = fx.orders.reject(order.id, fx.host_id).unwrap_err();
        assert!(matches!(err, OrderError::AlreadyResolved(_)));
    }
}
