//! Atomic multi-row procedures
//!
//! Each procedure runs inside a single write transaction so the engine's
//! coordination invariants hold under concurrent callers: one OPEN session
//! per table, order header and items created together, receipt tokens
//! generated exactly once.

use redb::{ReadableDatabase, ReadableTable};
use shared::models::{Guest, Session, SessionStatus, TableStatus};
use shared::order::{ApprovalStatus, Order, OrderItem, OrderOrigin, OrderStatus};
use shared::util::{now_millis, opaque_token, snowflake_id};
use tracing::info;

use super::{
    COUNTER_SESSIONS_TABLE, OPEN_SESSIONS_TABLE, ORDERS_TABLE, RECEIPT_TOKENS_TABLE,
    SESSION_ORDERS_TABLE, SessionStorage, StorageError, StorageResult, TABLES_TABLE,
};

/// Input for the atomic order-creation procedure.
///
/// The caller decides the approval outcome (entry rule lives in the order
/// service); the procedure recomputes authoritative totals from the items
/// and persists header and items as one record in one transaction.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub session_id: i64,
    pub origin: OrderOrigin,
    pub created_by_guest_id: Option<i64>,
    pub created_by_profile_id: Option<i64>,
    /// True when the entry rule grants approval at creation
    pub approved: bool,
    pub approved_by_guest_id: Option<i64>,
    pub items: Vec<OrderItem>,
    pub delivery_fee_cents: i64,
    /// Delete the submitter's cart lines in the same transaction
    pub clear_submitter_cart: bool,
}

/// Customer-facing read-only projection of a session's orders
#[derive(Debug, Clone, serde::Serialize)]
pub struct PublicReceipt {
    pub session_id: i64,
    pub table_id: Option<i64>,
    pub lines: Vec<ReceiptLine>,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub delivery_fee_cents: i64,
    pub total_cents: i64,
    pub generated_at: i64,
}

/// One grouped receipt line
#[derive(Debug, Clone, serde::Serialize)]
pub struct ReceiptLine {
    pub name: String,
    pub unit_price_cents: i64,
    pub qty: i64,
    pub total_cents: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl SessionStorage {
    /// Join a table's session, creating it if none is OPEN.
    ///
    /// Concurrent joins for the same table converge on a single session
    /// because the existence check and the creation happen in one write
    /// transaction. The guest that creates the session becomes host;
    /// host assignment never moves afterwards.
    pub fn join_table_session(
        &self,
        table_id: i64,
        guest_name: &str,
    ) -> StorageResult<(Session, Guest)> {
        let txn = self.begin_write()?;
        let (session, guest) = {
            let tables = txn.open_table(TABLES_TABLE)?;
            if tables.get(table_id)?.is_none() {
                return Err(StorageError::TableNotFound(table_id));
            }
            drop(tables);

            let index = txn.open_table(OPEN_SESSIONS_TABLE)?;
            let existing_id = index.get(table_id)?.map(|g| g.value());
            drop(index);

            match existing_id {
                Some(session_id) => {
                    let session = self
                        .get_session_txn(&txn, session_id)?
                        .ok_or(StorageError::SessionNotFound(session_id))?;
                    let guest = Guest::new(session.id, guest_name, false);
                    self.insert_guest_txn(&txn, &guest)?;
                    (session, guest)
                }
                None => {
                    let mut session = Session::for_table(table_id);
                    let guest = Guest::new(session.id, guest_name, true);
                    session.host_guest_id = Some(guest.id);
                    self.put_session_txn(&txn, &session)?;
                    self.insert_guest_txn(&txn, &guest)?;
                    let mut index = txn.open_table(OPEN_SESSIONS_TABLE)?;
                    index.insert(table_id, session.id)?;
                    drop(index);
                    self.set_table_status_txn(&txn, table_id, TableStatus::Occupied)?;
                    (session, guest)
                }
            }
        };
        txn.commit()?;
        info!(
            session_id = session.id,
            guest_id = guest.id,
            is_host = guest.is_host,
            "guest joined table session"
        );
        Ok((session, guest))
    }

    /// Get or create the OPEN counter session for a staff profile
    pub fn get_or_create_counter_session(&self, profile_id: i64) -> StorageResult<Session> {
        let txn = self.begin_write()?;
        let session = {
            let index = txn.open_table(COUNTER_SESSIONS_TABLE)?;
            let existing_id = index.get(profile_id)?.map(|g| g.value());
            drop(index);

            match existing_id {
                Some(session_id) => self
                    .get_session_txn(&txn, session_id)?
                    .ok_or(StorageError::SessionNotFound(session_id))?,
                None => {
                    let session = Session::for_counter(profile_id);
                    self.put_session_txn(&txn, &session)?;
                    let mut index = txn.open_table(COUNTER_SESSIONS_TABLE)?;
                    index.insert(profile_id, session.id)?;
                    session
                }
            }
        };
        txn.commit()?;
        Ok(session)
    }

    /// Create an order: header and items in one transaction.
    ///
    /// Totals are recomputed here from the items, never taken from the
    /// caller. `parent_order_id` is resolved to the session's root order so
    /// additional rounds group onto one kitchen ticket. When the entry rule
    /// granted approval and `clear_submitter_cart` is set, the submitter's
    /// cart lines are deleted in the same transaction.
    pub fn create_order(&self, new_order: NewOrder) -> StorageResult<Order> {
        let txn = self.begin_write()?;
        let order = {
            let session = self
                .get_session_txn(&txn, new_order.session_id)?
                .ok_or(StorageError::SessionNotFound(new_order.session_id))?;

            let parent_order_id = self.find_root_order_txn(&txn, session.id)?;

            let items: Vec<OrderItem> = new_order
                .items
                .into_iter()
                .filter(|i| i.qty > 0)
                .collect();
            let subtotal_cents: i64 = items
                .iter()
                .map(|i| (i.unit_price_cents + i.discount_cents) * i.qty)
                .sum();
            let discount_cents: i64 = items.iter().map(|i| i.discount_cents * i.qty).sum();
            let total_cents = subtotal_cents - discount_cents + new_order.delivery_fee_cents;

            let now = now_millis();
            let order = Order {
                id: snowflake_id(),
                session_id: session.id,
                table_id: session.table_id,
                origin: new_order.origin,
                parent_order_id,
                status: OrderStatus::Pending,
                approval_status: if new_order.approved {
                    ApprovalStatus::Approved
                } else {
                    ApprovalStatus::PendingApproval
                },
                created_by_guest_id: new_order.created_by_guest_id,
                created_by_profile_id: new_order.created_by_profile_id,
                approved_by_guest_id: if new_order.approved {
                    new_order.approved_by_guest_id
                } else {
                    None
                },
                approved_at: new_order.approved.then_some(now),
                items,
                subtotal_cents,
                discount_cents,
                delivery_fee_cents: new_order.delivery_fee_cents,
                total_cents,
                printed_at: None,
                printed_count: 0,
                created_at: now,
            };
            self.put_order_txn(&txn, &order)?;

            if new_order.approved && new_order.clear_submitter_cart {
                if let Some(guest_id) = new_order.created_by_guest_id {
                    self.delete_cart_lines_for_guest_txn(&txn, session.id, guest_id)?;
                }
            }
            order
        };
        txn.commit()?;
        info!(
            order_id = order.id,
            session_id = order.session_id,
            origin = ?order.origin,
            approval = %order.approval_status,
            total_cents = order.total_cents,
            "order created"
        );
        Ok(order)
    }

    /// Root order of a session: earliest non-rejected order without a parent
    fn find_root_order_txn(
        &self,
        txn: &redb::WriteTransaction,
        session_id: i64,
    ) -> StorageResult<Option<i64>> {
        let index = txn.open_table(SESSION_ORDERS_TABLE)?;
        let mut ids = Vec::new();
        for entry in index.range((session_id, i64::MIN)..=(session_id, i64::MAX))? {
            let (key, _) = entry?;
            ids.push(key.value().1);
        }
        drop(index);

        let orders = txn.open_table(ORDERS_TABLE)?;
        let mut root: Option<(i64, i64)> = None;
        for id in ids {
            if let Some(value) = orders.get(id)? {
                let order: Order = serde_json::from_slice(value.value())?;
                if order.parent_order_id.is_none()
                    && order.approval_status != ApprovalStatus::Rejected
                    && root.is_none_or(|(_, at)| order.created_at < at)
                {
                    root = Some((order.id, order.created_at));
                }
            }
        }
        Ok(root.map(|(id, _)| id))
    }

    /// Mark orders printed, skipping orders already printed.
    ///
    /// Returns the ids that were newly marked, so duplicate print requests
    /// never reach the printer twice.
    pub fn mark_orders_printed(&self, order_ids: &[i64]) -> StorageResult<Vec<i64>> {
        let txn = self.begin_write()?;
        let mut newly_printed = Vec::new();
        {
            let mut orders = txn.open_table(ORDERS_TABLE)?;
            for &order_id in order_ids {
                let mut order: Order = orders
                    .get(order_id)?
                    .map(|g| serde_json::from_slice(g.value()))
                    .transpose()?
                    .ok_or(StorageError::OrderNotFound(order_id))?;
                if order.printed_at.is_some() {
                    continue;
                }
                order.printed_at = Some(now_millis());
                order.printed_count += 1;
                orders.insert(order_id, serde_json::to_vec(&order)?.as_slice())?;
                newly_printed.push(order_id);
            }
        }
        txn.commit()?;
        Ok(newly_printed)
    }

    /// Get the session's public receipt token, generating it on first use
    pub fn ensure_receipt_token(&self, session_id: i64) -> StorageResult<String> {
        // Fast path outside the write transaction
        if let Some(token) = self.require_session(session_id)?.receipt_token {
            return Ok(token);
        }

        let txn = self.begin_write()?;
        let token = {
            let mut session = self
                .get_session_txn(&txn, session_id)?
                .ok_or(StorageError::SessionNotFound(session_id))?;
            // Re-check under the transaction: another writer may have won
            match session.receipt_token.clone() {
                Some(token) => token,
                None => {
                    let token = opaque_token();
                    session.receipt_token = Some(token.clone());
                    self.put_session_txn(&txn, &session)?;
                    let mut tokens = txn.open_table(RECEIPT_TOKENS_TABLE)?;
                    tokens.insert(token.as_str(), session_id)?;
                    token
                }
            }
        };
        txn.commit()?;
        Ok(token)
    }

    /// Resolve a receipt token to a grouped, read-only receipt projection.
    ///
    /// Only approved, non-cancelled orders contribute. Lines are merged by
    /// the grouping rules so the customer never sees duplicate rows.
    pub fn get_public_receipt(&self, token: &str) -> StorageResult<PublicReceipt> {
        let read_txn = self.db.begin_read()?;
        let tokens = read_txn.open_table(RECEIPT_TOKENS_TABLE)?;
        let session_id = tokens
            .get(token)?
            .map(|g| g.value())
            .ok_or(StorageError::UnknownReceiptToken)?;
        drop(tokens);
        drop(read_txn);

        let session = self.require_session(session_id)?;
        let orders: Vec<Order> = self
            .orders_for_session(session_id)?
            .into_iter()
            .filter(|o| {
                o.approval_status == ApprovalStatus::Approved
                    && o.status != OrderStatus::Cancelled
            })
            .collect();

        let all_items: Vec<OrderItem> = orders.iter().flat_map(|o| o.items.clone()).collect();
        let lines = crate::grouping::group(&all_items)
            .into_iter()
            .map(|l| ReceiptLine {
                name: l.name_snapshot,
                unit_price_cents: l.unit_price_cents,
                qty: l.qty,
                total_cents: l.unit_price_cents * l.qty,
                note: l.note,
            })
            .collect();

        Ok(PublicReceipt {
            session_id,
            table_id: session.table_id,
            lines,
            subtotal_cents: orders.iter().map(|o| o.subtotal_cents).sum(),
            discount_cents: orders.iter().map(|o| o.discount_cents).sum(),
            delivery_fee_cents: orders.iter().map(|o| o.delivery_fee_cents).sum(),
            total_cents: orders.iter().map(|o| o.total_cents).sum(),
            generated_at: now_millis(),
        })
    }

    /// Expire a session: status EXPIRED, indexes cleared, table freed.
    ///
    /// Idempotent so duplicate close-out requests are harmless.
    pub fn expire_session(&self, session_id: i64) -> StorageResult<Session> {
        let txn = self.begin_write()?;
        let session = {
            let mut session = self
                .get_session_txn(&txn, session_id)?
                .ok_or(StorageError::SessionNotFound(session_id))?;
            if session.status == SessionStatus::Expired {
                return Ok(session);
            }
            session.status = SessionStatus::Expired;
            session.closed_at = Some(now_millis());
            self.put_session_txn(&txn, &session)?;

            if let Some(table_id) = session.table_id {
                let mut index = txn.open_table(OPEN_SESSIONS_TABLE)?;
                index.remove(table_id)?;
                drop(index);
                self.set_table_status_txn(&txn, table_id, TableStatus::Free)?;
            }
            if let Some(profile_id) = session.counter_profile_id {
                let mut index = txn.open_table(COUNTER_SESSIONS_TABLE)?;
                index.remove(profile_id)?;
            }
            session
        };
        txn.commit()?;
        info!(session_id, "session expired");
        Ok(session)
    }
}
