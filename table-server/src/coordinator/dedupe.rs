//! Notification deduplication
//!
//! Rapid change-feed events for the same underlying fact (an order's row
//! updated twice in one commit cascade) must not stack identical toasts.
//! The cache is owned by its coordinator and dies with it, so one guest's
//! cool-downs never leak into another device's session.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

const DEFAULT_COOLDOWN: Duration = Duration::from_secs(5);

/// Cool-down cache keyed by (tag, title, body)
#[derive(Debug)]
pub struct NotifyDedupe {
    cooldown: Duration,
    seen: Mutex<HashMap<(String, String, String), Instant>>,
}

impl Default for NotifyDedupe {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN)
    }
}

impl NotifyDedupe {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            seen: Mutex::new(HashMap::new()),
        }
    }

    /// True when this notification has not fired within the cool-down.
    /// Recording and checking are one step so two racing events cannot
    /// both pass.
    pub fn should_send(&self, tag: &str, title: &str, body: &str) -> bool {
        let key = (tag.to_string(), title.to_string(), body.to_string());
        let now = Instant::now();
        let mut seen = self.seen.lock();
        match seen.get(&key) {
            Some(&last) if now.duration_since(last) < self.cooldown => false,
            _ => {
                seen.insert(key, now);
                true
            }
        }
    }
}
