//! Order creation and fulfillment
//!
//! Orders enter through two doors: guests submit their own cart, staff
//! inject lines directly (WAITER/BALCAO). Both go through the same atomic
//! storage procedure; the difference is the approval entry rule. Items are
//! snapshotted (name, unit price with promotion and add-ons resolved) at
//! creation so later catalog edits never rewrite an order.

pub mod approval;
pub mod lifecycle;
pub mod ticket;

pub use ticket::KitchenTicket;

use chrono::{DateTime, Utc};
use shared::cart::LineDetail;
use shared::error::{AppError, ErrorCode};
use shared::models::{Promotion, SessionStatus};
use shared::order::{ApprovalStatus, Order, OrderItem, OrderOrigin, OrderStatus};
use shared::{FeedEventType, FeedTable};
use thiserror::Error;
use tracing::info;

use crate::feed::ChangeFeed;
use crate::pricing;
use crate::storage::{NewOrder, SessionStorage, StorageError};

#[derive(Debug, Error)]
pub enum OrderError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Session {0} is locked")]
    SessionLocked(i64),

    #[error("Session {0} has expired")]
    SessionExpired(i64),

    #[error("Cart is empty")]
    CartEmpty,

    #[error("Guest has order {0} pending approval")]
    ApprovalPending(i64),

    #[error("Only the session host may resolve approvals")]
    HostRequired,

    #[error("Order {0} approval already resolved")]
    AlreadyResolved(i64),

    #[error("Order {0} admits no further changes")]
    OrderImmutable(i64),

    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Order {0} is not approved yet")]
    NotApproved(i64),

    #[error("Product {0} is not available")]
    ProductUnavailable(i64),

    #[error("Origin {0:?} is not a staff origin")]
    StaffOriginRequired(OrderOrigin),
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        let code = match &err {
            OrderError::Storage(_) => ErrorCode::StorageError,
            OrderError::SessionLocked(_) => ErrorCode::SessionLocked,
            OrderError::SessionExpired(_) => ErrorCode::SessionExpired,
            OrderError::CartEmpty => ErrorCode::CartEmpty,
            OrderError::ApprovalPending(_) | OrderError::NotApproved(_) => {
                ErrorCode::ApprovalPending
            }
            OrderError::HostRequired => ErrorCode::HostRequired,
            OrderError::AlreadyResolved(_) => ErrorCode::AlreadyResolved,
            OrderError::OrderImmutable(_) => ErrorCode::OrderImmutable,
            OrderError::InvalidTransition { .. } => ErrorCode::InvalidTransition,
            OrderError::ProductUnavailable(_) => ErrorCode::ValidationFailed,
            OrderError::StaffOriginRequired(_) => ErrorCode::PermissionDenied,
        };
        AppError::with_message(code, err.to_string())
    }
}

pub type OrderResult<T> = Result<T, OrderError>;

/// One line of a staff-injected order
#[derive(Debug, Clone)]
pub struct StaffLine {
    pub product_id: i64,
    pub qty: i64,
    pub note: Option<String>,
}

/// Order creation, approval and fulfillment over the durable store
#[derive(Debug, Clone)]
pub struct OrderService {
    storage: SessionStorage,
    feed: ChangeFeed,
}

impl OrderService {
    pub fn new(storage: SessionStorage, feed: ChangeFeed) -> Self {
        Self { storage, feed }
    }

    /// Submit a guest's cart as an order.
    ///
    /// Every precondition is re-checked against freshly read state: the
    /// session must be OPEN, the cart non-empty, and the guest must not
    /// already have an order awaiting approval. The entry rule decides the
    /// approval outcome: SELF approval mode or a host submitter creates
    /// the order APPROVED (and clears the cart in the same transaction),
    /// anything else creates it PENDING_APPROVAL with the cart kept.
    pub fn submit_guest_order(&self, session_id: i64, guest_id: i64) -> OrderResult<Order> {
        let session = self.storage.require_session(session_id)?;
        match session.status {
            SessionStatus::Open => {}
            SessionStatus::Locked => return Err(OrderError::SessionLocked(session_id)),
            SessionStatus::Expired => return Err(OrderError::SessionExpired(session_id)),
        }
        let guest = self.storage.require_guest(session_id, guest_id)?;

        if let Some(pending) = self
            .storage
            .orders_for_guest(session_id, guest_id)?
            .iter()
            .find(|o| o.blocks_submitter())
        {
            return Err(OrderError::ApprovalPending(pending.id));
        }

        let lines = self.storage.cart_lines_for_guest(session_id, guest_id)?;
        if lines.is_empty() {
            return Err(OrderError::CartEmpty);
        }

        let settings = self.storage.get_settings()?;
        let promotions = self.storage.list_promotions()?;
        let now = Utc::now();

        let mut items = Vec::with_capacity(lines.len());
        for line in &lines {
            items.push(self.snapshot_item(
                line.product_id,
                line.qty,
                line.detail.as_ref(),
                &guest.name,
                &promotions,
                now,
            )?);
        }

        let approved = settings.order_approval_mode == shared::models::ApprovalMode::SelfService
            || guest.is_host;
        let order = self.storage.create_order(NewOrder {
            session_id,
            origin: OrderOrigin::Customer,
            created_by_guest_id: Some(guest_id),
            created_by_profile_id: None,
            approved,
            approved_by_guest_id: approved.then_some(guest_id),
            items,
            delivery_fee_cents: self.delivery_fee(&session, &settings),
            clear_submitter_cart: true,
        })?;

        self.feed
            .signal(FeedEventType::Insert, FeedTable::Orders, session_id);
        if approved {
            self.feed
                .signal(FeedEventType::Delete, FeedTable::CartLines, session_id);
        }
        Ok(order)
    }

    /// Inject a staff order (WAITER/BALCAO), bypassing the approval gate.
    ///
    /// Allowed on LOCKED sessions; staff operations are exactly what a
    /// lock is for.
    pub fn create_staff_order(
        &self,
        session_id: i64,
        origin: OrderOrigin,
        profile_id: i64,
        staff_name: &str,
        lines: &[StaffLine],
    ) -> OrderResult<Order> {
        if !origin.is_staff() {
            return Err(OrderError::StaffOriginRequired(origin));
        }
        let session = self.storage.require_session(session_id)?;
        if session.status == SessionStatus::Expired {
            return Err(OrderError::SessionExpired(session_id));
        }
        if lines.is_empty() {
            return Err(OrderError::CartEmpty);
        }

        let settings = self.storage.get_settings()?;
        let promotions = self.storage.list_promotions()?;
        let now = Utc::now();

        let mut items = Vec::with_capacity(lines.len());
        for line in lines {
            let product = self.storage.require_product(line.product_id)?;
            if !product.is_active {
                return Err(OrderError::ProductUnavailable(line.product_id));
            }
            let quote = pricing::quote(product.id, product.price_cents, &promotions, now);
            items.push(OrderItem {
                product_id: product.id,
                name_snapshot: product.name,
                unit_price_cents: quote.final_unit_price_cents,
                qty: line.qty,
                note: crate::grouping::normalize_note(line.note.as_deref()),
                added_by_name: staff_name.to_string(),
                promo_name: quote.promo_name,
                discount_cents: quote.discount_cents,
            });
        }

        let order = self.storage.create_order(NewOrder {
            session_id,
            origin,
            created_by_guest_id: None,
            created_by_profile_id: Some(profile_id),
            approved: true,
            approved_by_guest_id: None,
            items,
            delivery_fee_cents: self.delivery_fee(&session, &settings),
            clear_submitter_cart: false,
        })?;

        self.feed
            .signal(FeedEventType::Insert, FeedTable::Orders, session_id);
        Ok(order)
    }

    /// Move an order along the fulfillment axis.
    ///
    /// Validated inside the write transaction against the stored state, so
    /// concurrent staff consoles cannot race an order past a terminal
    /// state. Starting preparation requires a resolved approval.
    pub fn transition(&self, order_id: i64, to: OrderStatus) -> OrderResult<Order> {
        let txn = self.storage.begin_write()?;
        let order = {
            let mut order = self
                .storage
                .get_order_txn(&txn, order_id)?
                .ok_or(StorageError::OrderNotFound(order_id))?;
            if order.is_immutable() {
                return Err(OrderError::OrderImmutable(order_id));
            }
            lifecycle::validate(order.status, to)?;
            if to == OrderStatus::Preparing && order.approval_status != ApprovalStatus::Approved {
                return Err(OrderError::NotApproved(order_id));
            }
            order.status = to;
            // Cancellation settles an unresolved approval in the same
            // transaction: the submitter's block must not outlive the
            // order, and a CANCELLED order can never be approved later
            if to == OrderStatus::Cancelled
                && order.approval_status == ApprovalStatus::PendingApproval
            {
                order.approval_status = ApprovalStatus::Rejected;
            }
            self.storage.put_order_txn(&txn, &order)?;
            order
        };
        txn.commit().map_err(StorageError::from)?;
        info!(order_id, status = %order.status, "order transitioned");
        self.feed
            .signal(FeedEventType::Update, FeedTable::Orders, order.session_id);
        Ok(order)
    }

    pub fn get(&self, order_id: i64) -> OrderResult<Order> {
        Ok(self.storage.require_order(order_id)?)
    }

    pub fn orders_for_session(&self, session_id: i64) -> OrderResult<Vec<Order>> {
        Ok(self.storage.orders_for_session(session_id)?)
    }

    /// Dine-in sessions carry no delivery fee; counter sessions do
    fn delivery_fee(
        &self,
        session: &shared::models::Session,
        settings: &shared::models::StoreSettings,
    ) -> i64 {
        if session.table_id.is_some() {
            0
        } else {
            settings.delivery_fee_cents
        }
    }

    /// Snapshot one cart line into a priced order item
    fn snapshot_item(
        &self,
        product_id: i64,
        qty: i64,
        detail: Option<&LineDetail>,
        added_by_name: &str,
        promotions: &[Promotion],
        now: DateTime<Utc>,
    ) -> OrderResult<OrderItem> {
        let product = self.storage.require_product(product_id)?;
        if !product.is_active {
            return Err(OrderError::ProductUnavailable(product_id));
        }
        let quote = pricing::quote(product.id, product.price_cents, promotions, now);
        let addon_total = detail.map_or(0, |d| d.addon_total_cents);
        Ok(OrderItem {
            product_id,
            name_snapshot: product.name,
            unit_price_cents: quote.final_unit_price_cents + addon_total,
            qty,
            note: detail.and_then(detail_note),
            added_by_name: added_by_name.to_string(),
            promo_name: quote.promo_name,
            discount_cents: quote.discount_cents,
        })
    }
}

/// Render a structured detail as the normalized free-text note carried on
/// the order item (add-on names, then the observation)
fn detail_note(detail: &LineDetail) -> Option<String> {
    let mut parts = Vec::new();
    if !detail.addon_names.is_empty() {
        parts.push(detail.addon_names.join(", "));
    }
    if let Some(obs) = &detail.observation {
        parts.push(obs.clone());
    }
    if parts.is_empty() {
        None
    } else {
        crate::grouping::normalize_note(Some(parts.join("\n").as_str()))
    }
}
