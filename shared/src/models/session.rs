//! Session and Guest models
//!
//! A session is the coordination scope for one table's dining visit.
//! Guests are ephemeral, unauthenticated identities scoped to one session;
//! the first guest to join becomes the host.

use serde::{Deserialize, Serialize};

/// Session lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    #[default]
    Open,
    /// Staff-locked: guests cannot mutate carts or submit orders
    Locked,
    /// Terminal: all participants must discard local session state
    Expired,
}

/// Session entity - the unit of coordination for one dining visit
///
/// Invariant: at most one OPEN session per table, enforced by the atomic
/// get-or-create procedure at the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: i64,
    pub status: SessionStatus,
    /// Table this session belongs to; None for staff counter sessions
    pub table_id: Option<i64>,
    /// Staff profile owning a counter session; None for table sessions
    pub counter_profile_id: Option<i64>,
    /// First guest to join; assigned exactly once, never transferred
    pub host_guest_id: Option<i64>,
    /// Lazily generated public receipt token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt_token: Option<String>,
    pub created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<i64>,
}

impl Session {
    /// New OPEN session for a table
    pub fn for_table(table_id: i64) -> Self {
        Self {
            id: crate::util::snowflake_id(),
            status: SessionStatus::Open,
            table_id: Some(table_id),
            counter_profile_id: None,
            host_guest_id: None,
            receipt_token: None,
            created_at: crate::util::now_millis(),
            closed_at: None,
        }
    }

    /// New OPEN counter session for a staff profile
    pub fn for_counter(profile_id: i64) -> Self {
        Self {
            id: crate::util::snowflake_id(),
            status: SessionStatus::Open,
            table_id: None,
            counter_profile_id: Some(profile_id),
            host_guest_id: None,
            receipt_token: None,
            created_at: crate::util::now_millis(),
            closed_at: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == SessionStatus::Open
    }
}

/// Guest entity - ephemeral per-device identity within one session
///
/// Not an authenticated account: persistence across reloads is client-side
/// only, so a device that clears storage becomes a new, unrelated guest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Guest {
    pub id: i64,
    pub session_id: i64,
    pub name: String,
    /// Exactly one true per session - the first guest to join
    pub is_host: bool,
    pub joined_at: i64,
}

impl Guest {
    pub fn new(session_id: i64, name: impl Into<String>, is_host: bool) -> Self {
        Self {
            id: crate::util::snowflake_id(),
            session_id,
            name: name.into(),
            is_host,
            joined_at: crate::util::now_millis(),
        }
    }
}
