//! Change-feed event shape
//!
//! Row-level events pushed to every subscribed client. An event is a dumb
//! invalidation signal: rapid events can coalesce or arrive out of order,
//! so consumers refetch the affected aggregate instead of trusting the
//! payload. `new`/`old` are carried for parity with the backing store's
//! feed shape but the coordinator only reads identifying keys from them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Row event type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeedEventType {
    Insert,
    Update,
    Delete,
}

/// Which aggregate the event invalidates
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FeedTable {
    Sessions,
    CartLines,
    Orders,
}

/// A single change-feed event, scoped to one session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub event_type: FeedEventType,
    pub table: FeedTable,
    pub session_id: i64,
    /// New row image, when the store provides one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new: Option<Value>,
    /// Old row image, when the store provides one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old: Option<Value>,
}

impl ChangeEvent {
    /// Bare invalidation signal with no row images
    pub fn signal(event_type: FeedEventType, table: FeedTable, session_id: i64) -> Self {
        Self {
            event_type,
            table,
            session_id,
            new: None,
            old: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serializes_without_row_images() {
        let ev = ChangeEvent::signal(FeedEventType::Insert, FeedTable::Orders, 7);
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["event_type"], "INSERT");
        assert_eq!(json["table"], "orders");
        assert_eq!(json["session_id"], 7);
        assert!(json.get("new").is_none());
        assert!(json.get("old").is_none());
    }
}
