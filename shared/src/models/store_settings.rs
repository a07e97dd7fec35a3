//! Store Settings Model

use serde::{Deserialize, Serialize};

/// Order approval mode for guest submissions
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalMode {
    /// Every guest's submission enters the kitchen queue directly
    #[default]
    #[serde(rename = "SELF")]
    SelfService,
    /// Non-host guest submissions must be ratified by the table host
    Host,
}

/// Store-level configuration consumed by the engine
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoreSettings {
    pub order_approval_mode: ApprovalMode,
    /// Flat delivery fee applied to counter takeout orders, in cents
    #[serde(default)]
    pub delivery_fee_cents: i64,
}
