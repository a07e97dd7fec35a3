//! Device-local persistence and notification seams
//!
//! The coordinator runs on each guest device; what "local storage" and
//! "show a notification" mean is platform business, so both sit behind
//! traits. The in-memory implementations back the tests.

use dashmap::DashMap;
use parking_lot::Mutex;

/// Guest identity a device remembers across reloads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub guest_id: i64,
    pub guest_name: String,
}

/// Per-session local persistence.
///
/// Everything stored here is scoped by session id and cleared wholesale
/// when the session expires; a device that clears this storage simply
/// becomes a new guest on the next scan.
pub trait DeviceStorage: Send + Sync {
    fn save_identity(&self, session_id: i64, identity: DeviceIdentity);
    fn load_identity(&self, session_id: i64) -> Option<DeviceIdentity>;
    /// Draft checkout fields (payment choice, notes) keyed by name
    fn save_draft(&self, session_id: i64, key: &str, value: &str);
    fn load_draft(&self, session_id: i64, key: &str) -> Option<String>;
    /// Drop everything this device holds for the session
    fn clear_session(&self, session_id: i64);
}

/// Where coordinator notifications land
pub trait NotificationSink: Send + Sync {
    fn notify(&self, tag: &str, title: &str, body: &str);
}

#[derive(Debug, Default)]
struct SessionRecord {
    identity: Option<DeviceIdentity>,
    drafts: std::collections::HashMap<String, String>,
}

/// In-memory device storage
#[derive(Debug, Default)]
pub struct MemoryDeviceStorage {
    records: DashMap<i64, SessionRecord>,
}

impl MemoryDeviceStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DeviceStorage for MemoryDeviceStorage {
    fn save_identity(&self, session_id: i64, identity: DeviceIdentity) {
        self.records.entry(session_id).or_default().identity = Some(identity);
    }

    fn load_identity(&self, session_id: i64) -> Option<DeviceIdentity> {
        self.records.get(&session_id).and_then(|r| r.identity.clone())
    }

    fn save_draft(&self, session_id: i64, key: &str, value: &str) {
        self.records
            .entry(session_id)
            .or_default()
            .drafts
            .insert(key.to_string(), value.to_string());
    }

    fn load_draft(&self, session_id: i64, key: &str) -> Option<String> {
        self.records
            .get(&session_id)
            .and_then(|r| r.drafts.get(key).cloned())
    }

    fn clear_session(&self, session_id: i64) {
        self.records.remove(&session_id);
    }
}

/// Sink that records notifications for assertions
#[derive(Debug, Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<(String, String, String)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(String, String, String)> {
        self.sent.lock().clone()
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, tag: &str, title: &str, body: &str) {
        self.sent
            .lock()
            .push((tag.to_string(), title.to_string(), body.to_string()));
    }
}
