//! Session lifecycle
//!
//! A session is the coordination scope for one table's dining visit.
//! Joining goes through the atomic get-or-create procedure, so any number
//! of concurrent QR scans for the same table converge on one OPEN session
//! and exactly one host. Closing is a staff action and the only path that
//! expires a session and frees its table.

use shared::error::{AppError, ErrorCode};
use shared::models::{Guest, Session, SessionStatus};
use shared::{FeedEventType, FeedTable};
use thiserror::Error;
use tracing::{info, warn};

use crate::feed::ChangeFeed;
use crate::storage::{SessionStorage, StorageError};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Unknown or inactive table token")]
    InvalidTableToken,

    #[error("Session {0} has expired")]
    SessionExpired(i64),
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        let code = match &err {
            SessionError::Storage(_) => ErrorCode::StorageError,
            SessionError::InvalidTableToken => ErrorCode::InvalidTableToken,
            SessionError::SessionExpired(_) => ErrorCode::SessionExpired,
        };
        AppError::with_message(code, err.to_string())
    }
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Session lifecycle over the durable store
#[derive(Debug, Clone)]
pub struct SessionManager {
    storage: SessionStorage,
    feed: ChangeFeed,
}

impl SessionManager {
    pub fn new(storage: SessionStorage, feed: ChangeFeed) -> Self {
        Self { storage, feed }
    }

    /// Join a table by its QR token, creating the session if none is OPEN.
    ///
    /// The first joiner becomes host; the assignment never moves.
    pub fn join_table(&self, token: &str, guest_name: &str) -> SessionResult<(Session, Guest)> {
        let table = self
            .storage
            .get_table_by_token(token)?
            .filter(|t| t.is_active)
            .ok_or(SessionError::InvalidTableToken)?;

        let (session, guest) = self.storage.join_table_session(table.id, guest_name)?;
        self.feed
            .signal(FeedEventType::Update, FeedTable::Sessions, session.id);
        Ok((session, guest))
    }

    /// Get or create the counter session for a staff profile
    pub fn counter_session(&self, profile_id: i64) -> SessionResult<Session> {
        Ok(self.storage.get_or_create_counter_session(profile_id)?)
    }

    /// Staff lock: guests can no longer mutate carts or submit orders
    pub fn lock(&self, session_id: i64) -> SessionResult<Session> {
        self.set_status(session_id, SessionStatus::Locked)
    }

    /// Staff unlock: back to normal guest operation
    pub fn unlock(&self, session_id: i64) -> SessionResult<Session> {
        self.set_status(session_id, SessionStatus::Open)
    }

    /// Staff close-out: the session becomes EXPIRED, the one-open-session
    /// index entry is removed and the table is freed. Idempotent.
    pub fn force_close(&self, session_id: i64) -> SessionResult<Session> {
        let session = self.storage.expire_session(session_id)?;
        self.feed
            .signal(FeedEventType::Update, FeedTable::Sessions, session_id);
        Ok(session)
    }

    pub fn get(&self, session_id: i64) -> SessionResult<Session> {
        Ok(self.storage.require_session(session_id)?)
    }

    pub fn guests(&self, session_id: i64) -> SessionResult<Vec<Guest>> {
        Ok(self.storage.guests_for_session(session_id)?)
    }

    fn set_status(&self, session_id: i64, status: SessionStatus) -> SessionResult<Session> {
        let txn = self.storage.begin_write()?;
        let session = {
            let mut session = self
                .storage
                .get_session_txn(&txn, session_id)?
                .ok_or(StorageError::SessionNotFound(session_id))?;
            if session.status == SessionStatus::Expired {
                warn!(session_id, "status change on expired session refused");
                return Err(SessionError::SessionExpired(session_id));
            }
            session.status = status;
            self.storage.put_session_txn(&txn, &session)?;
            session
        };
        txn.commit().map_err(StorageError::from)?;
        info!(session_id, status = ?session.status, "session status changed");
        self.feed
            .signal(FeedEventType::Update, FeedTable::Sessions, session_id);
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::DiningTable;

    fn manager() -> (SessionManager, SessionStorage, DiningTable) {
        let storage = SessionStorage::open_in_memory().unwrap();
        let table = DiningTable::new("Mesa 1");
        storage.insert_table(&table).unwrap();
        let manager = SessionManager::new(storage.clone(), ChangeFeed::new());
        (manager, storage, table)
    }

    #[test]
    fn join_by_token_creates_then_reuses_the_session() {
        let (manager, _, table) = manager();

        let (session, ana) = manager.join_table(&table.token, "Ana").unwrap();
        assert!(ana.is_host);

        let (same, bruno) = manager.join_table(&table.token, "Bruno").unwrap();
        assert_eq!(same.id, session.id);
        assert!(!bruno.is_host);
        assert_eq!(manager.guests(session.id).unwrap().len(), 2);
    }

    #[test]
    fn bad_or_inactive_tokens_are_refused() {
        let (manager, storage, table) = manager();
        assert!(matches!(
            manager.join_table("bogus", "Ana").unwrap_err(),
            SessionError::InvalidTableToken
        ));

        let mut inactive = table.clone();
        inactive.is_active = false;
        storage.insert_table(&inactive).unwrap();
        assert!(matches!(
            manager.join_table(&table.token, "Ana").unwrap_err(),
            SessionError::InvalidTableToken
        ));
    }

    #[test]
    fn lock_and_unlock_round_trip() {
        let (manager, _, table) = manager();
        let (session, _) = manager.join_table(&table.token, "Ana").unwrap();

        assert_eq!(manager.lock(session.id).unwrap().status, SessionStatus::Locked);
        assert_eq!(manager.unlock(session.id).unwrap().status, SessionStatus::Open);
    }

    #[test]
    fn close_out_is_terminal() {
        let (manager, _, table) = manager();
        let (session, _) = manager.join_table(&table.token, "Ana").unwrap();

        let closed = manager.force_close(session.id).unwrap();
        assert_eq!(closed.status, SessionStatus::Expired);

        // No lock/unlock after expiry
        assert!(matches!(
            manager.lock(session.id).unwrap_err(),
            SessionError::SessionExpired(_)
        ));
        // But closing again is harmless
        manager.force_close(session.id).unwrap();
    }
}
