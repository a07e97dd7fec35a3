//! Multi-guest session/cart/order coordination engine
//!
//! Diners scan a per-table QR code, join a shared session, build personal
//! carts and submit orders that an approval workflow routes to kitchen and
//! staff views. This crate implements the coordination core:
//!
//! - **storage**: redb-backed durable store with the atomic procedures the
//!   coordination rules depend on (get-or-create session, create order)
//! - **pricing**: pure promotion resolution over integer cents
//! - **grouping**: deterministic merging of duplicate line items
//! - **promotions**: write-time promotion conflict validation
//! - **carts**: guest-partitioned cart mutation rules
//! - **orders**: fulfillment + approval state machines, kitchen tickets
//! - **sessions**: session lifecycle and host arbitration
//! - **feed**: broadcast change feed consumed as invalidation signals
//! - **coordinator**: the client-side resynchronization contract
//!
//! # Data Flow
//!
//! 1. Guest devices and staff consoles mutate carts and create orders
//!    through the storage write API
//! 2. Every committed write publishes a [`shared::ChangeEvent`] on the feed
//! 3. Each client's [`coordinator::SessionCoordinator`] reacts by
//!    refetching the affected aggregate, never by trusting the event
//! 4. Derived view state (totals, pending-approval flags) is recomputed
//!    via pricing and grouping

pub mod carts;
pub mod coordinator;
pub mod feed;
pub mod grouping;
pub mod orders;
pub mod pricing;
pub mod promotions;
pub mod sessions;
pub mod storage;

// Re-exports
pub use carts::CartStore;
pub use coordinator::SessionCoordinator;
pub use feed::ChangeFeed;
pub use orders::OrderService;
pub use sessions::SessionManager;
pub use storage::SessionStorage;
