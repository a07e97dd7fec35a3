//! Guest-partitioned cart store
//!
//! Cart lines are keyed by the owning guest, so two guests can never write
//! each other's lines and cross-guest write-write conflicts are impossible
//! by construction. Every rule here is checked against freshly read state,
//! never against whatever view the client claims to hold.

use shared::cart::{CartLine, LineDetail};
use shared::error::{AppError, ErrorCode};
use shared::models::SessionStatus;
use shared::{FeedEventType, FeedTable};
use thiserror::Error;
use tracing::debug;

use crate::feed::ChangeFeed;
use crate::storage::{SessionStorage, StorageError};

#[derive(Debug, Error)]
pub enum CartError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Session {0} is locked")]
    SessionLocked(i64),

    #[error("Session {0} has expired")]
    SessionExpired(i64),

    #[error("Cart line not found: {0}")]
    LineNotFound(i64),

    #[error("Guest {guest_id} does not own cart line {line_id}")]
    NotLineOwner { line_id: i64, guest_id: i64 },

    #[error("Guest has order {0} pending approval")]
    ApprovalPending(i64),
}

impl From<CartError> for AppError {
    fn from(err: CartError) -> Self {
        let code = match &err {
            CartError::Storage(_) => ErrorCode::StorageError,
            CartError::SessionLocked(_) => ErrorCode::SessionLocked,
            CartError::SessionExpired(_) => ErrorCode::SessionExpired,
            CartError::LineNotFound(_) => ErrorCode::CartLineNotFound,
            CartError::NotLineOwner { .. } => ErrorCode::NotLineOwner,
            CartError::ApprovalPending(_) => ErrorCode::ApprovalPending,
        };
        AppError::with_message(code, err.to_string())
    }
}

pub type CartResult<T> = Result<T, CartError>;

/// Cart mutation rules over the durable store
#[derive(Debug, Clone)]
pub struct CartStore {
    storage: SessionStorage,
    feed: ChangeFeed,
}

impl CartStore {
    pub fn new(storage: SessionStorage, feed: ChangeFeed) -> Self {
        Self { storage, feed }
    }

    /// Add `delta` to the guest's line for `(product_id, detail)`.
    ///
    /// Merges with an existing line carrying the identical product and
    /// detail; a resulting qty <= 0 deletes the line, so lines never
    /// persist at zero or below. `delta <= 0` with no matching line is a
    /// no-op. Returns the line as stored, or None when it was deleted.
    pub fn increment(
        &self,
        session_id: i64,
        guest_id: i64,
        product_id: i64,
        delta: i64,
        detail: Option<LineDetail>,
    ) -> CartResult<Option<CartLine>> {
        self.check_guest_can_mutate(session_id, guest_id)?;

        // Safe to match outside the write transaction: only this guest's
        // device writes this guest's lines
        let existing = self
            .storage
            .cart_lines_for_guest(session_id, guest_id)?
            .into_iter()
            .find(|l| l.matches(product_id, detail.as_ref()));

        match existing {
            Some(mut line) => {
                line.qty += delta;
                let txn = self.storage.begin_write()?;
                if line.qty <= 0 {
                    self.storage.delete_cart_line_txn(&txn, session_id, line.id)?;
                    txn.commit().map_err(StorageError::from)?;
                    self.feed
                        .signal(FeedEventType::Delete, FeedTable::CartLines, session_id);
                    Ok(None)
                } else {
                    self.storage.put_cart_line_txn(&txn, &line)?;
                    txn.commit().map_err(StorageError::from)?;
                    self.feed
                        .signal(FeedEventType::Update, FeedTable::CartLines, session_id);
                    Ok(Some(line))
                }
            }
            None if delta > 0 => {
                let line = CartLine::new(session_id, guest_id, product_id, delta, detail);
                let txn = self.storage.begin_write()?;
                self.storage.put_cart_line_txn(&txn, &line)?;
                txn.commit().map_err(StorageError::from)?;
                self.feed
                    .signal(FeedEventType::Insert, FeedTable::CartLines, session_id);
                Ok(Some(line))
            }
            None => {
                debug!(session_id, guest_id, product_id, delta, "no-op decrement");
                Ok(None)
            }
        }
    }

    /// Remove one line. Only the owning guest may remove it.
    pub fn remove_line(&self, session_id: i64, guest_id: i64, line_id: i64) -> CartResult<()> {
        self.check_guest_can_mutate(session_id, guest_id)?;

        let line = self
            .storage
            .cart_lines_for_session(session_id)?
            .into_iter()
            .find(|l| l.id == line_id)
            .ok_or(CartError::LineNotFound(line_id))?;
        if line.guest_id != guest_id {
            return Err(CartError::NotLineOwner { line_id, guest_id });
        }

        let txn = self.storage.begin_write()?;
        self.storage.delete_cart_line_txn(&txn, session_id, line_id)?;
        txn.commit().map_err(StorageError::from)?;
        self.feed
            .signal(FeedEventType::Delete, FeedTable::CartLines, session_id);
        Ok(())
    }

    /// Remove all of one guest's lines. Other guests' lines are untouched.
    pub fn remove_all(&self, session_id: i64, guest_id: i64) -> CartResult<usize> {
        self.check_guest_can_mutate(session_id, guest_id)?;

        let txn = self.storage.begin_write()?;
        let removed = self
            .storage
            .delete_cart_lines_for_guest_txn(&txn, session_id, guest_id)?;
        txn.commit().map_err(StorageError::from)?;
        if removed > 0 {
            self.feed
                .signal(FeedEventType::Delete, FeedTable::CartLines, session_id);
        }
        Ok(removed)
    }

    pub fn lines_for_guest(&self, session_id: i64, guest_id: i64) -> CartResult<Vec<CartLine>> {
        Ok(self.storage.cart_lines_for_guest(session_id, guest_id)?)
    }

    pub fn lines_for_session(&self, session_id: i64) -> CartResult<Vec<CartLine>> {
        Ok(self.storage.cart_lines_for_session(session_id)?)
    }

    /// Fresh-state gate shared by every mutation: the session must be OPEN
    /// for guests, the guest must exist, and a guest with their own
    /// PENDING_APPROVAL order may not touch the cart until the host rules.
    fn check_guest_can_mutate(&self, session_id: i64, guest_id: i64) -> CartResult<()> {
        let session = self.storage.require_session(session_id)?;
        match session.status {
            SessionStatus::Open => {}
            SessionStatus::Locked => return Err(CartError::SessionLocked(session_id)),
            SessionStatus::Expired => return Err(CartError::SessionExpired(session_id)),
        }
        self.storage.require_guest(session_id, guest_id)?;

        if let Some(pending) = self
            .storage
            .orders_for_guest(session_id, guest_id)?
            .iter()
            .find(|o| o.blocks_submitter())
        {
            return Err(CartError::ApprovalPending(pending.id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::DiningTable;
    use shared::order::{OrderItem, OrderOrigin};

    fn setup() -> (CartStore, SessionStorage, i64, i64, i64) {
        let storage = SessionStorage::open_in_memory().unwrap();
        let table = DiningTable::new("Mesa 1");
        storage.insert_table(&table).unwrap();
        let (session, ana) = storage.join_table_session(table.id, "Ana").unwrap();
        let (_, bruno) = storage.join_table_session(table.id, "Bruno").unwrap();
        let carts = CartStore::new(storage.clone(), ChangeFeed::new());
        (carts, storage, session.id, ana.id, bruno.id)
    }

    fn detail(observation: &str) -> LineDetail {
        LineDetail {
            addon_ids: vec![],
            addon_names: vec![],
            addon_total_cents: 0,
            observation: Some(observation.to_string()),
        }
    }

    #[test]
    fn increment_merges_only_identical_product_and_detail() {
        let (carts, _, session, ana, _) = setup();

        let plain = carts.increment(session, ana, 100, 2, None).unwrap().unwrap();
        let merged = carts.increment(session, ana, 100, 1, None).unwrap().unwrap();
        assert_eq!(merged.id, plain.id);
        assert_eq!(merged.qty, 3);

        // Different detail creates a separate line
        let with_note = carts
            .increment(session, ana, 100, 1, Some(detail("sem cebola")))
            .unwrap()
            .unwrap();
        assert_ne!(with_note.id, plain.id);
        assert_eq!(carts.lines_for_guest(session, ana).unwrap().len(), 2);
    }

    #[test]
    fn decrement_to_zero_deletes_the_line() {
        let (carts, _, session, ana, _) = setup();
        carts.increment(session, ana, 100, 2, None).unwrap();

        assert!(carts.increment(session, ana, 100, -2, None).unwrap().is_none());
        assert!(carts.lines_for_guest(session, ana).unwrap().is_empty());

        // Decrement with nothing to decrement is a no-op
        assert!(carts.increment(session, ana, 100, -1, None).unwrap().is_none());
    }

    #[test]
    fn guests_cannot_touch_each_others_lines() {
        let (carts, _, session, ana, bruno) = setup();
        let line = carts.increment(session, ana, 100, 1, None).unwrap().unwrap();

        let err = carts.remove_line(session, bruno, line.id).unwrap_err();
        assert!(matches!(err, CartError::NotLineOwner { .. }));

        // remove_all only clears the caller's partition
        carts.increment(session, bruno, 200, 3, None).unwrap();
        assert_eq!(carts.remove_all(session, bruno).unwrap(), 1);
        assert_eq!(carts.lines_for_guest(session, ana).unwrap().len(), 1);
    }

    #[test]
    fn locked_session_blocks_guest_mutation() {
        let (carts, storage, session, ana, _) = setup();
        carts.increment(session, ana, 100, 1, None).unwrap();

        let mut s = storage.require_session(session).unwrap();
        s.status = SessionStatus::Locked;
        let txn = storage.begin_write().unwrap();
        storage.put_session_txn(&txn, &s).unwrap();
        txn.commit().unwrap();

        let err = carts.increment(session, ana, 100, 1, None).unwrap_err();
        assert!(matches!(err, CartError::SessionLocked(_)));
        let err = carts.remove_all(session, ana).unwrap_err();
        assert!(matches!(err, CartError::SessionLocked(_)));
    }

    #[test]
    fn pending_approval_blocks_the_submitter_only() {
        let (carts, storage, session, ana, bruno) = setup();

        storage
            .create_order(crate::storage::NewOrder {
                session_id: session,
                origin: OrderOrigin::Customer,
                created_by_guest_id: Some(bruno),
                created_by_profile_id: None,
                approved: false,
                approved_by_guest_id: None,
                items: vec![OrderItem {
                    product_id: 100,
                    name_snapshot: "X-Burger".to_string(),
                    unit_price_cents: 2500,
                    qty: 1,
                    note: None,
                    added_by_name: "Bruno".to_string(),
                    promo_name: None,
                    discount_cents: 0,
                }],
                delivery_fee_cents: 0,
                clear_submitter_cart: false,
            })
            .unwrap();

        let err = carts.increment(session, bruno, 100, 1, None).unwrap_err();
        assert!(matches!(err, CartError::ApprovalPending(_)));

        // Ana is unaffected
        assert!(carts.increment(session, ana, 100, 1, None).unwrap().is_some());
    }
}
