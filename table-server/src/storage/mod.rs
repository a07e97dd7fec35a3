//! redb-based durable store for session coordination
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `tables` | `table_id` | `DiningTable` | Physical tables |
//! | `table_tokens` | `token` | `table_id` | QR-token lookup |
//! | `sessions` | `session_id` | `Session` | Session rows |
//! | `open_sessions` | `table_id` | `session_id` | One-OPEN-session-per-table index |
//! | `counter_sessions` | `profile_id` | `session_id` | Staff counter session index |
//! | `guests` | `(session_id, guest_id)` | `Guest` | Session guests |
//! | `cart_lines` | `(session_id, line_id)` | `CartLine` | Unsubmitted lines |
//! | `products` | `product_id` | `Product` | Catalog rows snapshotted into orders |
//! | `orders` | `order_id` | `Order` | Orders with embedded items |
//! | `session_orders` | `(session_id, order_id)` | `()` | Per-session order index |
//! | `promotions` | `promotion_id` | `Promotion` | Promotion catalog |
//! | `receipt_tokens` | `token` | `session_id` | Public receipt lookup |
//! | `settings` | `"store"` | `StoreSettings` | Engine configuration |
//!
//! # Atomicity
//!
//! The write transaction is the atomicity boundary. Every multi-row
//! invariant in the engine (one OPEN session per table, order header and
//! items created together, cart cleanup on approval) is enforced inside a
//! single transaction in [`procedures`]. Commits are durable as soon as
//! `commit()` returns, which matters for devices that lose power mid-shift.

mod procedures;

pub use procedures::{NewOrder, PublicReceipt, ReceiptLine};

use redb::{
    Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction,
};
use shared::cart::CartLine;
use shared::models::{DiningTable, Guest, Product, Promotion, Session, StoreSettings, TableStatus};
use shared::order::Order;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Physical tables: key = table_id, value = JSON-serialized DiningTable
const TABLES_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("tables");

/// QR-token lookup: key = token, value = table_id
const TABLE_TOKENS_TABLE: TableDefinition<&str, i64> = TableDefinition::new("table_tokens");

/// Sessions: key = session_id, value = JSON-serialized Session
const SESSIONS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("sessions");

/// Open-session singleton index: key = table_id, value = session_id
const OPEN_SESSIONS_TABLE: TableDefinition<i64, i64> = TableDefinition::new("open_sessions");

/// Counter-session index: key = staff profile_id, value = session_id
const COUNTER_SESSIONS_TABLE: TableDefinition<i64, i64> =
    TableDefinition::new("counter_sessions");

/// Guests: key = (session_id, guest_id), value = JSON-serialized Guest
const GUESTS_TABLE: TableDefinition<(i64, i64), &[u8]> = TableDefinition::new("guests");

/// Cart lines: key = (session_id, line_id), value = JSON-serialized CartLine
const CART_LINES_TABLE: TableDefinition<(i64, i64), &[u8]> = TableDefinition::new("cart_lines");

/// Products: key = product_id, value = JSON-serialized Product
const PRODUCTS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("products");

/// Orders: key = order_id, value = JSON-serialized Order (items embedded)
const ORDERS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("orders");

/// Per-session order index: key = (session_id, order_id), value = ()
const SESSION_ORDERS_TABLE: TableDefinition<(i64, i64), ()> =
    TableDefinition::new("session_orders");

/// Promotions: key = promotion_id, value = JSON-serialized Promotion
const PROMOTIONS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("promotions");

/// Public receipt lookup: key = token, value = session_id
const RECEIPT_TOKENS_TABLE: TableDefinition<&str, i64> = TableDefinition::new("receipt_tokens");

/// Settings: key = "store", value = JSON-serialized StoreSettings
const SETTINGS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("settings");

const SETTINGS_KEY: &str = "store";

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Table not found: {0}")]
    TableNotFound(i64),

    #[error("Unknown table token")]
    UnknownTableToken,

    #[error("Session not found: {0}")]
    SessionNotFound(i64),

    #[error("Guest not found: session={0}, guest={1}")]
    GuestNotFound(i64, i64),

    #[error("Product not found: {0}")]
    ProductNotFound(i64),

    #[error("Order not found: {0}")]
    OrderNotFound(i64),

    #[error("Unknown receipt token")]
    UnknownReceiptToken,

    #[error("Promotion not found: {0}")]
    PromotionNotFound(i64),

    #[error(
        "Conflicting active product promotion: product={product_id}, weekday={weekday}, existing={existing_id}"
    )]
    PromotionConflict {
        product_id: i64,
        weekday: u8,
        existing_id: i64,
    },
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Session store backed by redb
#[derive(Clone)]
pub struct SessionStorage {
    db: Arc<Database>,
}

impl SessionStorage {
    /// Open or create the database at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StorageResult<Self> {
        // Create all tables up front so readers never race table creation
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(TABLES_TABLE)?;
            let _ = write_txn.open_table(TABLE_TOKENS_TABLE)?;
            let _ = write_txn.open_table(SESSIONS_TABLE)?;
            let _ = write_txn.open_table(OPEN_SESSIONS_TABLE)?;
            let _ = write_txn.open_table(COUNTER_SESSIONS_TABLE)?;
            let _ = write_txn.open_table(GUESTS_TABLE)?;
            let _ = write_txn.open_table(CART_LINES_TABLE)?;
            let _ = write_txn.open_table(PRODUCTS_TABLE)?;
            let _ = write_txn.open_table(ORDERS_TABLE)?;
            let _ = write_txn.open_table(SESSION_ORDERS_TABLE)?;
            let _ = write_txn.open_table(PROMOTIONS_TABLE)?;
            let _ = write_txn.open_table(RECEIPT_TOKENS_TABLE)?;
            let _ = write_txn.open_table(SETTINGS_TABLE)?;
        }
        write_txn.commit()?;
        Ok(Self { db: Arc::new(db) })
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    // ========== Dining Tables ==========

    /// Insert a new physical table and its token index entry
    pub fn insert_table(&self, table: &DiningTable) -> StorageResult<()> {
        let txn = self.begin_write()?;
        {
            let mut tables = txn.open_table(TABLES_TABLE)?;
            tables.insert(table.id, serde_json::to_vec(table)?.as_slice())?;
            let mut tokens = txn.open_table(TABLE_TOKENS_TABLE)?;
            tokens.insert(table.token.as_str(), table.id)?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn get_table(&self, table_id: i64) -> StorageResult<Option<DiningTable>> {
        let read_txn = self.db.begin_read()?;
        let tables = read_txn.open_table(TABLES_TABLE)?;
        tables
            .get(table_id)?
            .map(|g| serde_json::from_slice(g.value()).map_err(StorageError::from))
            .transpose()
    }

    /// Resolve a QR token to its table
    pub fn get_table_by_token(&self, token: &str) -> StorageResult<Option<DiningTable>> {
        let read_txn = self.db.begin_read()?;
        let tokens = read_txn.open_table(TABLE_TOKENS_TABLE)?;
        let Some(table_id) = tokens.get(token)?.map(|g| g.value()) else {
            return Ok(None);
        };
        drop(tokens);
        let tables = read_txn.open_table(TABLES_TABLE)?;
        tables
            .get(table_id)?
            .map(|g| serde_json::from_slice(g.value()).map_err(StorageError::from))
            .transpose()
    }

    /// Update a table's cached occupancy projection (within a transaction)
    pub(crate) fn set_table_status_txn(
        &self,
        txn: &WriteTransaction,
        table_id: i64,
        status: TableStatus,
    ) -> StorageResult<()> {
        let mut tables = txn.open_table(TABLES_TABLE)?;
        let mut table: DiningTable = tables
            .get(table_id)?
            .map(|g| serde_json::from_slice(g.value()))
            .transpose()?
            .ok_or(StorageError::TableNotFound(table_id))?;
        table.status = status;
        tables.insert(table_id, serde_json::to_vec(&table)?.as_slice())?;
        Ok(())
    }

    // ========== Sessions ==========

    pub fn get_session(&self, session_id: i64) -> StorageResult<Option<Session>> {
        let read_txn = self.db.begin_read()?;
        let sessions = read_txn.open_table(SESSIONS_TABLE)?;
        sessions
            .get(session_id)?
            .map(|g| serde_json::from_slice(g.value()).map_err(StorageError::from))
            .transpose()
    }

    /// Load a session or fail
    pub fn require_session(&self, session_id: i64) -> StorageResult<Session> {
        self.get_session(session_id)?
            .ok_or(StorageError::SessionNotFound(session_id))
    }

    pub(crate) fn put_session_txn(
        &self,
        txn: &WriteTransaction,
        session: &Session,
    ) -> StorageResult<()> {
        let mut sessions = txn.open_table(SESSIONS_TABLE)?;
        sessions.insert(session.id, serde_json::to_vec(session)?.as_slice())?;
        Ok(())
    }

    pub(crate) fn get_session_txn(
        &self,
        txn: &WriteTransaction,
        session_id: i64,
    ) -> StorageResult<Option<Session>> {
        let sessions = txn.open_table(SESSIONS_TABLE)?;
        sessions
            .get(session_id)?
            .map(|g| serde_json::from_slice(g.value()).map_err(StorageError::from))
            .transpose()
    }

    /// Find the OPEN session for a table, if any
    pub fn find_open_session_for_table(&self, table_id: i64) -> StorageResult<Option<Session>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(OPEN_SESSIONS_TABLE)?;
        let Some(session_id) = index.get(table_id)?.map(|g| g.value()) else {
            return Ok(None);
        };
        drop(index);
        let sessions = read_txn.open_table(SESSIONS_TABLE)?;
        sessions
            .get(session_id)?
            .map(|g| serde_json::from_slice(g.value()).map_err(StorageError::from))
            .transpose()
    }

    // ========== Guests ==========

    pub(crate) fn insert_guest_txn(
        &self,
        txn: &WriteTransaction,
        guest: &Guest,
    ) -> StorageResult<()> {
        let mut guests = txn.open_table(GUESTS_TABLE)?;
        guests.insert(
            (guest.session_id, guest.id),
            serde_json::to_vec(guest)?.as_slice(),
        )?;
        Ok(())
    }

    pub fn get_guest(&self, session_id: i64, guest_id: i64) -> StorageResult<Option<Guest>> {
        let read_txn = self.db.begin_read()?;
        let guests = read_txn.open_table(GUESTS_TABLE)?;
        guests
            .get((session_id, guest_id))?
            .map(|g| serde_json::from_slice(g.value()).map_err(StorageError::from))
            .transpose()
    }

    /// Load a guest or fail
    pub fn require_guest(&self, session_id: i64, guest_id: i64) -> StorageResult<Guest> {
        self.get_guest(session_id, guest_id)?
            .ok_or(StorageError::GuestNotFound(session_id, guest_id))
    }

    pub fn guests_for_session(&self, session_id: i64) -> StorageResult<Vec<Guest>> {
        let read_txn = self.db.begin_read()?;
        let guests = read_txn.open_table(GUESTS_TABLE)?;
        let mut out = Vec::new();
        for entry in guests.range((session_id, i64::MIN)..=(session_id, i64::MAX))? {
            let (_, value) = entry?;
            out.push(serde_json::from_slice(value.value())?);
        }
        Ok(out)
    }

    // ========== Cart Lines ==========

    pub(crate) fn put_cart_line_txn(
        &self,
        txn: &WriteTransaction,
        line: &CartLine,
    ) -> StorageResult<()> {
        let mut lines = txn.open_table(CART_LINES_TABLE)?;
        lines.insert(
            (line.session_id, line.id),
            serde_json::to_vec(line)?.as_slice(),
        )?;
        Ok(())
    }

    pub(crate) fn delete_cart_line_txn(
        &self,
        txn: &WriteTransaction,
        session_id: i64,
        line_id: i64,
    ) -> StorageResult<bool> {
        let mut lines = txn.open_table(CART_LINES_TABLE)?;
        Ok(lines.remove((session_id, line_id))?.is_some())
    }

    pub fn cart_lines_for_session(&self, session_id: i64) -> StorageResult<Vec<CartLine>> {
        let read_txn = self.db.begin_read()?;
        let lines = read_txn.open_table(CART_LINES_TABLE)?;
        let mut out: Vec<CartLine> = Vec::new();
        for entry in lines.range((session_id, i64::MIN)..=(session_id, i64::MAX))? {
            let (_, value) = entry?;
            out.push(serde_json::from_slice(value.value())?);
        }
        out.sort_by_key(|l| l.created_at);
        Ok(out)
    }

    pub fn cart_lines_for_guest(
        &self,
        session_id: i64,
        guest_id: i64,
    ) -> StorageResult<Vec<CartLine>> {
        Ok(self
            .cart_lines_for_session(session_id)?
            .into_iter()
            .filter(|l| l.guest_id == guest_id)
            .collect())
    }

    /// Delete exactly one guest's cart lines (within a transaction).
    /// Returns the number of lines removed.
    pub(crate) fn delete_cart_lines_for_guest_txn(
        &self,
        txn: &WriteTransaction,
        session_id: i64,
        guest_id: i64,
    ) -> StorageResult<usize> {
        let mut lines = txn.open_table(CART_LINES_TABLE)?;
        let mut to_remove = Vec::new();
        for entry in lines.range((session_id, i64::MIN)..=(session_id, i64::MAX))? {
            let (key, value) = entry?;
            let line: CartLine = serde_json::from_slice(value.value())?;
            if line.guest_id == guest_id {
                to_remove.push(key.value());
            }
        }
        for key in &to_remove {
            lines.remove(*key)?;
        }
        Ok(to_remove.len())
    }

    // ========== Products ==========

    /// Insert or replace a catalog product
    pub fn upsert_product(&self, product: &Product) -> StorageResult<()> {
        let txn = self.begin_write()?;
        {
            let mut products = txn.open_table(PRODUCTS_TABLE)?;
            products.insert(product.id, serde_json::to_vec(product)?.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn get_product(&self, product_id: i64) -> StorageResult<Option<Product>> {
        let read_txn = self.db.begin_read()?;
        let products = read_txn.open_table(PRODUCTS_TABLE)?;
        products
            .get(product_id)?
            .map(|g| serde_json::from_slice(g.value()).map_err(StorageError::from))
            .transpose()
    }

    /// Load a product or fail
    pub fn require_product(&self, product_id: i64) -> StorageResult<Product> {
        self.get_product(product_id)?
            .ok_or(StorageError::ProductNotFound(product_id))
    }

    // ========== Orders ==========

    pub(crate) fn put_order_txn(&self, txn: &WriteTransaction, order: &Order) -> StorageResult<()> {
        let mut orders = txn.open_table(ORDERS_TABLE)?;
        orders.insert(order.id, serde_json::to_vec(order)?.as_slice())?;
        let mut index = txn.open_table(SESSION_ORDERS_TABLE)?;
        index.insert((order.session_id, order.id), ())?;
        Ok(())
    }

    pub fn get_order(&self, order_id: i64) -> StorageResult<Option<Order>> {
        let read_txn = self.db.begin_read()?;
        let orders = read_txn.open_table(ORDERS_TABLE)?;
        orders
            .get(order_id)?
            .map(|g| serde_json::from_slice(g.value()).map_err(StorageError::from))
            .transpose()
    }

    /// Load an order or fail
    pub fn require_order(&self, order_id: i64) -> StorageResult<Order> {
        self.get_order(order_id)?
            .ok_or(StorageError::OrderNotFound(order_id))
    }

    pub(crate) fn get_order_txn(
        &self,
        txn: &WriteTransaction,
        order_id: i64,
    ) -> StorageResult<Option<Order>> {
        let orders = txn.open_table(ORDERS_TABLE)?;
        orders
            .get(order_id)?
            .map(|g| serde_json::from_slice(g.value()).map_err(StorageError::from))
            .transpose()
    }

    pub fn orders_for_session(&self, session_id: i64) -> StorageResult<Vec<Order>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(SESSION_ORDERS_TABLE)?;
        let mut ids = Vec::new();
        for entry in index.range((session_id, i64::MIN)..=(session_id, i64::MAX))? {
            let (key, _) = entry?;
            ids.push(key.value().1);
        }
        drop(index);
        let orders = read_txn.open_table(ORDERS_TABLE)?;
        let mut out: Vec<Order> = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(value) = orders.get(id)? {
                out.push(serde_json::from_slice(value.value())?);
            }
        }
        out.sort_by_key(|o| o.created_at);
        Ok(out)
    }

    /// Orders created by a guest within a session (fresh read, used to
    /// enforce the pending-approval submission block)
    pub fn orders_for_guest(&self, session_id: i64, guest_id: i64) -> StorageResult<Vec<Order>> {
        Ok(self
            .orders_for_session(session_id)?
            .into_iter()
            .filter(|o| o.created_by_guest_id == Some(guest_id))
            .collect())
    }

    // ========== Promotions ==========

    /// Insert a promotion, enforcing the write-time conflict invariant:
    /// no two active PRODUCT-scoped promotions may share both a product
    /// and a weekday. Rejected before any state change.
    pub fn create_promotion(&self, promotion: &Promotion) -> StorageResult<()> {
        let txn = self.begin_write()?;
        {
            let mut promos = txn.open_table(PROMOTIONS_TABLE)?;
            if promotion.active {
                let existing = Self::scan_promotions(&promos)?;
                crate::promotions::check_conflict(promotion, &existing)?;
            }
            promos.insert(promotion.id, serde_json::to_vec(promotion)?.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Toggle a promotion's active flag, re-validating conflicts on
    /// activation
    pub fn set_promotion_active(&self, promotion_id: i64, active: bool) -> StorageResult<()> {
        let txn = self.begin_write()?;
        {
            let mut promos = txn.open_table(PROMOTIONS_TABLE)?;
            let mut promotion: Promotion = promos
                .get(promotion_id)?
                .map(|g| serde_json::from_slice(g.value()))
                .transpose()?
                .ok_or(StorageError::PromotionNotFound(promotion_id))?;
            if active && !promotion.active {
                let existing = Self::scan_promotions(&promos)?;
                let mut activated = promotion.clone();
                activated.active = true;
                crate::promotions::check_conflict(&activated, &existing)?;
            }
            promotion.active = active;
            promos.insert(promotion_id, serde_json::to_vec(&promotion)?.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn list_promotions(&self) -> StorageResult<Vec<Promotion>> {
        let read_txn = self.db.begin_read()?;
        let promos = read_txn.open_table(PROMOTIONS_TABLE)?;
        Self::scan_promotions(&promos)
    }

    fn scan_promotions(
        promos: &impl ReadableTable<i64, &'static [u8]>,
    ) -> StorageResult<Vec<Promotion>> {
        let mut out = Vec::new();
        for entry in promos.iter()? {
            let (_, value) = entry?;
            out.push(serde_json::from_slice(value.value())?);
        }
        Ok(out)
    }

    // ========== Settings ==========

    pub fn get_settings(&self) -> StorageResult<StoreSettings> {
        let read_txn = self.db.begin_read()?;
        let settings = read_txn.open_table(SETTINGS_TABLE)?;
        Ok(settings
            .get(SETTINGS_KEY)?
            .map(|g| serde_json::from_slice(g.value()))
            .transpose()?
            .unwrap_or_default())
    }

    pub fn put_settings(&self, settings: &StoreSettings) -> StorageResult<()> {
        let txn = self.begin_write()?;
        {
            let mut table = txn.open_table(SETTINGS_TABLE)?;
            table.insert(SETTINGS_KEY, serde_json::to_vec(settings)?.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }
}

impl std::fmt::Debug for SessionStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStorage").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{DiscountType, PromotionScope};

    fn promo(id: i64, scope: PromotionScope, product_id: Option<i64>, weekdays: Vec<u8>) -> Promotion {
        Promotion {
            id,
            name: format!("promo-{id}"),
            scope,
            product_id,
            discount_type: DiscountType::Percent,
            discount_value: 10,
            weekdays,
            active: true,
        }
    }

    #[test]
    fn table_round_trip_and_token_lookup() {
        let storage = SessionStorage::open_in_memory().unwrap();
        let table = DiningTable::new("Mesa 1");
        storage.insert_table(&table).unwrap();

        let loaded = storage.get_table(table.id).unwrap().unwrap();
        assert_eq!(loaded.name, "Mesa 1");
        assert_eq!(loaded.status, TableStatus::Free);

        let by_token = storage.get_table_by_token(&table.token).unwrap().unwrap();
        assert_eq!(by_token.id, table.id);
        assert!(storage.get_table_by_token("bogus").unwrap().is_none());
    }

    #[test]
    fn cart_lines_are_scoped_per_session() {
        let storage = SessionStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let line_a = CartLine::new(1, 10, 100, 2, None);
        let line_b = CartLine::new(2, 20, 100, 1, None);
        storage.put_cart_line_txn(&txn, &line_a).unwrap();
        storage.put_cart_line_txn(&txn, &line_b).unwrap();
        txn.commit().unwrap();

        let session_1 = storage.cart_lines_for_session(1).unwrap();
        assert_eq!(session_1.len(), 1);
        assert_eq!(session_1[0].guest_id, 10);

        let session_2 = storage.cart_lines_for_session(2).unwrap();
        assert_eq!(session_2.len(), 1);
        assert_eq!(session_2[0].guest_id, 20);
    }

    #[test]
    fn conflicting_product_promotion_is_rejected_before_write() {
        let storage = SessionStorage::open_in_memory().unwrap();
        storage
            .create_promotion(&promo(1, PromotionScope::Product, Some(42), vec![1, 2]))
            .unwrap();

        // Same product, overlapping weekday
        let err = storage
            .create_promotion(&promo(2, PromotionScope::Product, Some(42), vec![2, 3]))
            .unwrap_err();
        assert!(matches!(err, StorageError::PromotionConflict { .. }));

        // No partial state change
        assert_eq!(storage.list_promotions().unwrap().len(), 1);

        // Disjoint weekdays are fine
        storage
            .create_promotion(&promo(3, PromotionScope::Product, Some(42), vec![5]))
            .unwrap();
        // Global promotions never conflict
        storage
            .create_promotion(&promo(4, PromotionScope::Global, None, vec![1, 2]))
            .unwrap();
    }

    #[test]
    fn committed_state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.redb");
        let table = DiningTable::new("Mesa 1");
        let session_id;
        {
            let storage = SessionStorage::open(&path).unwrap();
            storage.insert_table(&table).unwrap();
            let (session, _) = storage.join_table_session(table.id, "Ana").unwrap();
            session_id = session.id;
        }

        let storage = SessionStorage::open(&path).unwrap();
        assert_eq!(storage.get_table(table.id).unwrap().unwrap().name, "Mesa 1");
        let reopened = storage.find_open_session_for_table(table.id).unwrap().unwrap();
        assert_eq!(reopened.id, session_id);
        assert_eq!(storage.guests_for_session(session_id).unwrap().len(), 1);
    }

    #[test]
    fn settings_default_when_absent() {
        let storage = SessionStorage::open_in_memory().unwrap();
        let settings = storage.get_settings().unwrap();
        assert_eq!(
            settings.order_approval_mode,
            shared::models::ApprovalMode::SelfService
        );
    }
}
