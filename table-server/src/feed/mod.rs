//! Broadcast change feed
//!
//! Every committed mutation publishes a [`ChangeEvent`] here. Events are
//! invalidation signals only: subscribers refetch the affected aggregate
//! from storage and must never reconstruct state from event payloads.
//! Delivery is per-subscriber lossy (a lagging subscriber drops the oldest
//! events), which is safe precisely because refetching resynchronizes.

use shared::{ChangeEvent, FeedEventType, FeedTable};
use tokio::sync::broadcast;
use tracing::debug;

/// Buffered events per subscriber before lag kicks in
const FEED_CAPACITY: usize = 256;

/// Fan-out hub for committed-write notifications
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<ChangeEvent>,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeFeed {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(FEED_CAPACITY);
        Self { tx }
    }

    /// Subscribe to all events; filter by session on the receiving side
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }

    /// Publish an event. Called only after the write committed.
    pub fn publish(&self, event: ChangeEvent) {
        debug!(
            event_type = ?event.event_type,
            table = ?event.table,
            session_id = event.session_id,
            receivers = self.tx.receiver_count(),
            "feed event"
        );
        // Err only means no subscriber is listening right now
        let _ = self.tx.send(event);
    }

    /// Shorthand for a payload-free invalidation signal
    pub fn signal(&self, event_type: FeedEventType, table: FeedTable, session_id: i64) {
        self.publish(ChangeEvent::signal(event_type, table, session_id));
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let feed = ChangeFeed::new();
        let mut rx = feed.subscribe();

        feed.signal(FeedEventType::Insert, FeedTable::Orders, 42);
        let event = rx.recv().await.unwrap();
        assert_eq!(event.session_id, 42);
        assert_eq!(event.table, FeedTable::Orders);
        assert!(event.new.is_none());
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_a_noop() {
        let feed = ChangeFeed::new();
        feed.signal(FeedEventType::Update, FeedTable::Sessions, 1);
        assert_eq!(feed.subscriber_count(), 0);
    }
}
