//! Shared types for the table-ordering platform
//!
//! Common types used across crates: domain models, the unified error
//! system, the change-feed event shape, and small utilities.

pub mod cart;
pub mod error;
pub mod feed;
pub mod models;
pub mod order;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use cart::{CartLine, LineDetail};
pub use feed::{ChangeEvent, FeedEventType, FeedTable};
pub use order::{ApprovalStatus, Order, OrderItem, OrderOrigin, OrderStatus};
