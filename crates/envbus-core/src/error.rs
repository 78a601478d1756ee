//! Shared error type across envbus crates.

use thiserror::Error;

/// Stable diagnostic codes (used in logs and metrics labels).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Malformed envelope or payload.
    BadRequest,
    /// Inner handler asked to send before a target origin was captured.
    Uninitialized,
    /// A second party tried to claim the channel with another origin.
    OriginMismatch,
    /// Unsupported config/protocol version.
    UnsupportedVersion,
    /// A delegate callback failed.
    Delegate,
    /// Internal error.
    Internal,
}

impl ErrorCode {
    /// String representation used in diagnostics.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::BadRequest => "BAD_REQUEST",
            ErrorCode::Uninitialized => "UNINITIALIZED",
            ErrorCode::OriginMismatch => "ORIGIN_MISMATCH",
            ErrorCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ErrorCode::Delegate => "DELEGATE",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, BusError>;

/// Unified error type used by core and runtime.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("uninitialized send: no target origin captured before sending {0}")]
    Uninitialized(&'static str),
    #[error("origin mismatch: captured {captured}, got {offered}")]
    OriginMismatch { captured: String, offered: String },
    #[error("unsupported version")]
    UnsupportedVersion,
    #[error("delegate failed: {0}")]
    Delegate(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl BusError {
    /// Map to a stable diagnostic code.
    pub fn code(&self) -> ErrorCode {
        match self {
            BusError::BadRequest(_) => ErrorCode::BadRequest,
            BusError::Uninitialized(_) => ErrorCode::Uninitialized,
            BusError::OriginMismatch { .. } => ErrorCode::OriginMismatch,
            BusError::UnsupportedVersion => ErrorCode::UnsupportedVersion,
            BusError::Delegate(_) => ErrorCode::Delegate,
            BusError::Internal(_) => ErrorCode::Internal,
        }
    }
}
