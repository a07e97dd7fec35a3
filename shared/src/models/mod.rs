//! Domain models

pub mod dining_table;
pub mod product;
pub mod promotion;
pub mod session;
pub mod store_settings;

pub use dining_table::{DiningTable, TableStatus};
pub use product::Product;
pub use promotion::{DiscountType, PromotionScope, Promotion};
pub use session::{Guest, Session, SessionStatus};
pub use store_settings::{ApprovalMode, StoreSettings};
