//! Unified error codes for the table-ordering platform
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Session errors
//! - 2xxx: Permission errors
//! - 3xxx: Cart errors
//! - 4xxx: Order errors
//! - 5xxx: Promotion errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility (Rust, TypeScript, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,

    // ==================== 1xxx: Session ====================
    /// Session not found
    SessionNotFound = 1001,
    /// Session has expired
    SessionExpired = 1002,
    /// Session is locked
    SessionLocked = 1003,
    /// Guest not found in session
    GuestNotFound = 1004,
    /// Table not found
    TableNotFound = 1005,
    /// Table token is invalid
    InvalidTableToken = 1006,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,
    /// Only the session host may perform this operation
    HostRequired = 2002,
    /// Cart line is owned by another guest
    NotLineOwner = 2003,

    // ==================== 3xxx: Cart ====================
    /// Cart line not found
    CartLineNotFound = 3001,
    /// Cart is empty
    CartEmpty = 3002,
    /// Guest has an unresolved pending-approval order
    ApprovalPending = 3003,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Invalid status transition
    InvalidTransition = 4002,
    /// Order already resolved (approved or rejected)
    AlreadyResolved = 4003,
    /// Order is terminal and immutable
    OrderImmutable = 4004,

    // ==================== 5xxx: Promotion ====================
    /// Conflicting active promotion on the same product and weekday
    PromotionConflict = 5001,

    // ==================== 9xxx: System ====================
    /// Internal error
    InternalError = 9001,
    /// Storage error
    StorageError = 9002,
}

impl ErrorCode {
    /// Get the default human-readable message for this code
    pub fn message(&self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::Unknown => "Unknown error",
            Self::ValidationFailed => "Validation failed",
            Self::NotFound => "Resource not found",
            Self::AlreadyExists => "Resource already exists",
            Self::InvalidRequest => "Invalid request",
            Self::SessionNotFound => "Session not found",
            Self::SessionExpired => "Session has expired",
            Self::SessionLocked => "Session is locked",
            Self::GuestNotFound => "Guest not found in session",
            Self::TableNotFound => "Table not found",
            Self::InvalidTableToken => "Table token is invalid",
            Self::PermissionDenied => "Permission denied",
            Self::HostRequired => "Only the session host may perform this operation",
            Self::NotLineOwner => "Cart line is owned by another guest",
            Self::CartLineNotFound => "Cart line not found",
            Self::CartEmpty => "Cart is empty",
            Self::ApprovalPending => "Guest has an unresolved pending-approval order",
            Self::OrderNotFound => "Order not found",
            Self::InvalidTransition => "Invalid status transition",
            Self::AlreadyResolved => "Order already resolved",
            Self::OrderImmutable => "Order is terminal and immutable",
            Self::PromotionConflict => "Conflicting active promotion",
            Self::InternalError => "Internal error",
            Self::StorageError => "Storage error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message(), *self as u16)
    }
}

impl From<ErrorCode> for u16 {
    fn from(code: ErrorCode) -> Self {
        code as u16
    }
}

/// Error returned when converting an unknown u16 into an [`ErrorCode`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid error code: {0}")]
pub struct InvalidErrorCode(pub u16);

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        let code = match value {
            0 => Self::Success,
            1 => Self::Unknown,
            2 => Self::ValidationFailed,
            3 => Self::NotFound,
            4 => Self::AlreadyExists,
            5 => Self::InvalidRequest,
            1001 => Self::SessionNotFound,
            1002 => Self::SessionExpired,
            1003 => Self::SessionLocked,
            1004 => Self::GuestNotFound,
            1005 => Self::TableNotFound,
            1006 => Self::InvalidTableToken,
            2001 => Self::PermissionDenied,
            2002 => Self::HostRequired,
            2003 => Self::NotLineOwner,
            3001 => Self::CartLineNotFound,
            3002 => Self::CartEmpty,
            3003 => Self::ApprovalPending,
            4001 => Self::OrderNotFound,
            4002 => Self::InvalidTransition,
            4003 => Self::AlreadyResolved,
            4004 => Self::OrderImmutable,
            5001 => Self::PromotionConflict,
            9001 => Self::InternalError,
            9002 => Self::StorageError,
            other => return Err(InvalidErrorCode(other)),
        };
        Ok(code)
    }
}
