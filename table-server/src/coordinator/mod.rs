//! Client-side session coordinator
//!
//! One coordinator runs per connected device. It listens to the change
//! feed and treats every event as an invalidation signal: the reaction is
//! always to refetch the affected aggregate through an [`AggregateSource`]
//! and diff it against the last known snapshot. Event payloads are never
//! trusted, so out-of-order or coalesced delivery cannot corrupt the view;
//! convergence comes from the refetch alone.

mod dedupe;
mod device;

pub use dedupe::NotifyDedupe;
pub use device::{
    DeviceIdentity, DeviceStorage, MemoryDeviceStorage, NotificationSink, RecordingSink,
};

use parking_lot::Mutex;
use shared::cart::CartLine;
use shared::models::{Session, SessionStatus};
use shared::order::{ApprovalStatus, Order, OrderStatus};
use shared::{ChangeEvent, FeedTable};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::storage::{SessionStorage, StorageError};

/// Read access to the authoritative aggregates the coordinator refetches
pub trait AggregateSource: Send + Sync {
    fn fetch_session(&self, session_id: i64) -> Result<Option<Session>, StorageError>;
    fn fetch_orders(&self, session_id: i64) -> Result<Vec<Order>, StorageError>;
    fn fetch_cart_lines(&self, session_id: i64) -> Result<Vec<CartLine>, StorageError>;
}

impl AggregateSource for SessionStorage {
    fn fetch_session(&self, session_id: i64) -> Result<Option<Session>, StorageError> {
        self.get_session(session_id)
    }

    fn fetch_orders(&self, session_id: i64) -> Result<Vec<Order>, StorageError> {
        self.orders_for_session(session_id)
    }

    fn fetch_cart_lines(&self, session_id: i64) -> Result<Vec<CartLine>, StorageError> {
        self.cart_lines_for_session(session_id)
    }
}

#[derive(Debug, Default)]
struct CoordState {
    /// Last seen (fulfillment, approval) per order, for transition diffing
    known_orders: HashMap<i64, (OrderStatus, ApprovalStatus)>,
    /// This guest's local cart view
    cart_lines: Vec<CartLine>,
    cart_drawer_open: bool,
    /// Expiry purge already ran; duplicate delivery becomes a no-op
    ended: bool,
}

/// Per-device reactor over the change feed
pub struct SessionCoordinator {
    session_id: i64,
    guest_id: i64,
    source: Arc<dyn AggregateSource>,
    device: Arc<dyn DeviceStorage>,
    sink: Arc<dyn NotificationSink>,
    dedupe: NotifyDedupe,
    state: Mutex<CoordState>,
}

impl SessionCoordinator {
    pub fn new(
        session_id: i64,
        guest_id: i64,
        source: Arc<dyn AggregateSource>,
        device: Arc<dyn DeviceStorage>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            session_id,
            guest_id,
            source,
            device,
            sink,
            dedupe: NotifyDedupe::default(),
            state: Mutex::new(CoordState::default()),
        }
    }

    /// Prime the snapshot from current state, without notifications
    pub fn initial_sync(&self) -> Result<(), StorageError> {
        self.resync_orders(false)?;
        self.resync_cart()?;
        Ok(())
    }

    /// React to one feed event. Events for other sessions are no-ops.
    pub fn handle_event(&self, event: &ChangeEvent) -> Result<(), StorageError> {
        if event.session_id != self.session_id {
            return Ok(());
        }
        if self.state.lock().ended {
            debug!(session_id = self.session_id, "event after expiry ignored");
            return Ok(());
        }
        match event.table {
            FeedTable::Sessions => self.resync_session(),
            FeedTable::Orders => self.resync_orders(true),
            FeedTable::CartLines => self.resync_cart(),
        }
    }

    /// Drive the coordinator until cancellation or feed shutdown
    pub async fn run(
        &self,
        mut receiver: broadcast::Receiver<ChangeEvent>,
        cancel: CancellationToken,
    ) {
        if let Err(err) = self.initial_sync() {
            warn!(session_id = self.session_id, %err, "initial sync failed");
        }
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                event = receiver.recv() => match event {
                    Ok(event) => {
                        if let Err(err) = self.handle_event(&event) {
                            warn!(session_id = self.session_id, %err, "resync failed");
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        // Dropped events are recovered by a full refetch
                        debug!(session_id = self.session_id, missed, "feed lagged");
                        let _ = self.resync_session();
                        let _ = self.resync_orders(true);
                        let _ = self.resync_cart();
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
    }

    // ========== View state ==========

    pub fn open_cart_drawer(&self) {
        self.state.lock().cart_drawer_open = true;
    }

    pub fn is_cart_drawer_open(&self) -> bool {
        self.state.lock().cart_drawer_open
    }

    /// This guest's cart lines as last synced
    pub fn cart_view(&self) -> Vec<CartLine> {
        self.state.lock().cart_lines.clone()
    }

    /// True once the session expired and local state was purged
    pub fn has_ended(&self) -> bool {
        self.state.lock().ended
    }

    // ========== Resync reactions ==========

    fn resync_session(&self) -> Result<(), StorageError> {
        let expired = match self.source.fetch_session(self.session_id)? {
            Some(session) => session.status == SessionStatus::Expired,
            // A vanished session is treated like an expired one
            None => true,
        };
        if expired {
            let mut state = self.state.lock();
            if !state.ended {
                state.ended = true;
                state.cart_lines.clear();
                state.cart_drawer_open = false;
                drop(state);
                self.device.clear_session(self.session_id);
                self.sink
                    .notify("session", "Session ended", "This table's session was closed");
                info!(session_id = self.session_id, "local session state purged");
            }
        }
        Ok(())
    }

    fn resync_orders(&self, notify: bool) -> Result<(), StorageError> {
        let orders = self.source.fetch_orders(self.session_id)?;
        let mut state = self.state.lock();
        for order in &orders {
            let previous = state
                .known_orders
                .insert(order.id, (order.status, order.approval_status));
            if !notify {
                continue;
            }
            match previous {
                None => {
                    if order.created_by_guest_id != Some(self.guest_id) {
                        self.notify_deduped(
                            "order",
                            "New order",
                            &format!("{} sent an order", order_author(order)),
                        );
                    }
                }
                Some((old_status, old_approval)) => {
                    if old_status != OrderStatus::Ready && order.status == OrderStatus::Ready {
                        self.notify_deduped(
                            "order",
                            "Order ready",
                            &format!("Order #{} is ready", order.id),
                        );
                    }
                    if order.created_by_guest_id == Some(self.guest_id)
                        && old_approval == ApprovalStatus::PendingApproval
                        && order.approval_status == ApprovalStatus::Approved
                    {
                        // The submitted cart was consumed by the approval
                        state.cart_lines.clear();
                        state.cart_drawer_open = false;
                    }
                }
            }
        }
        Ok(())
    }

    fn resync_cart(&self) -> Result<(), StorageError> {
        let lines: Vec<CartLine> = self
            .source
            .fetch_cart_lines(self.session_id)?
            .into_iter()
            .filter(|l| l.guest_id == self.guest_id)
            .collect();
        self.state.lock().cart_lines = lines;
        Ok(())
    }

    fn notify_deduped(&self, tag: &str, title: &str, body: &str) {
        if self.dedupe.should_send(tag, title, body) {
            self.sink.notify(tag, title, body);
        }
    }
}

fn order_author(order: &Order) -> String {
    order
        .items
        .first()
        .map(|i| i.added_by_name.clone())
        .unwrap_or_else(|| "Someone".to_string())
}

impl std::fmt::Debug for SessionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCoordinator")
            .field("session_id", &self.session_id)
            .field("guest_id", &self.guest_id)
            .finish_non_exhaustive()
    }
}
