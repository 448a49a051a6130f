//! Unified error codes
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Guest errors
//! - 3xxx: Sync errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility with the UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Validation failed
    ValidationFailed = 2,
    /// Invalid request
    InvalidRequest = 5,

    // ==================== 1xxx: Auth ====================
    /// Remote identity has not been established
    NotAuthenticated = 1001,

    // ==================== 2xxx: Guest ====================
    /// Guest not found
    GuestNotFound = 2001,
    /// Guest full name is invalid
    GuestNameInvalid = 2002,
    /// Table name is invalid
    TableNameInvalid = 2003,
    /// Companion count out of range
    CompanionsOutOfRange = 2004,
    /// Batch import rejected before any write
    ImportRejected = 2005,

    // ==================== 3xxx: Sync ====================
    /// Remote write failed
    RemoteWriteFailed = 3001,
    /// Remote read failed
    RemoteReadFailed = 3002,
    /// A queue drain is already running
    SyncInProgress = 3003,
    /// Pending action dropped after exhausting its retries
    MaxRetriesExceeded = 3004,

    // ==================== 9xxx: System ====================
    /// Local storage error
    StorageError = 9002,
    /// Network error
    NetworkError = 9003,
    /// Storage corrupted (data file damaged)
    StorageCorrupted = 9403,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Whether an operation failing with this code may succeed when replayed later
    #[inline]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorCode::RemoteWriteFailed | ErrorCode::NetworkError | ErrorCode::RemoteReadFailed
        )
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::InvalidRequest => "Invalid request",

            // Auth
            ErrorCode::NotAuthenticated => "Remote identity is not established",

            // Guest
            ErrorCode::GuestNotFound => "Guest not found",
            ErrorCode::GuestNameInvalid => "Full name must be between 2 and 100 characters",
            ErrorCode::TableNameInvalid => "Table name must be between 1 and 50 characters",
            ErrorCode::CompanionsOutOfRange => "Companions must be between 0 and 10",
            ErrorCode::ImportRejected => "Import rejected, no guest was written",

            // Sync
            ErrorCode::RemoteWriteFailed => "Remote write failed",
            ErrorCode::RemoteReadFailed => "Remote read failed",
            ErrorCode::SyncInProgress => "Synchronization already in progress",
            ErrorCode::MaxRetriesExceeded => "Pending action dropped after max retries",

            // System
            ErrorCode::StorageError => "Local storage error",
            ErrorCode::NetworkError => "Network error",
            ErrorCode::StorageCorrupted => "Storage corrupted (data file damaged)",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            2 => Ok(ErrorCode::ValidationFailed),
            5 => Ok(ErrorCode::InvalidRequest),

            // Auth
            1001 => Ok(ErrorCode::NotAuthenticated),

            // Guest
            2001 => Ok(ErrorCode::GuestNotFound),
            2002 => Ok(ErrorCode::GuestNameInvalid),
            2003 => Ok(ErrorCode::TableNameInvalid),
            2004 => Ok(ErrorCode::CompanionsOutOfRange),
            2005 => Ok(ErrorCode::ImportRejected),

            // Sync
            3001 => Ok(ErrorCode::RemoteWriteFailed),
            3002 => Ok(ErrorCode::RemoteReadFailed),
            3003 => Ok(ErrorCode::SyncInProgress),
            3004 => Ok(ErrorCode::MaxRetriesExceeded),

            // System
            9002 => Ok(ErrorCode::StorageError),
            9003 => Ok(ErrorCode::NetworkError),
            9403 => Ok(ErrorCode::StorageCorrupted),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
