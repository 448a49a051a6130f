//! Application error type

use super::codes::ErrorCode;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Application error with structured error code and details
///
/// This is the error the guest facade hands to UI code:
/// - Standardized error codes via [`ErrorCode`]
/// - Human-readable messages
/// - Optional structured details (offending field, record index, ...)
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct AppError {
    /// The error code identifying the type of error
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    pub details: Option<HashMap<String, Value>>,
}

impl AppError {
    /// Create a new error with the default message for the error code
    pub fn new(code: ErrorCode) -> Self {
        Self {
            message: code.message().to_string(),
            code,
            details: None,
        }
    }

    /// Create a new error with a custom message
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Add a detail entry to this error
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Whether replaying the failed operation later may succeed
    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_new() {
        let err = AppError::new(ErrorCode::GuestNotFound);
        assert_eq!(err.code, ErrorCode::GuestNotFound);
        assert_eq!(err.message, "Guest not found");
        assert!(err.details.is_none());
    }

    #[test]
    fn test_app_error_with_detail() {
        let err = AppError::with_message(ErrorCode::GuestNameInvalid, "Full name is too short")
            .with_detail("field", "fullName")
            .with_detail("index", 3);

        assert_eq!(err.code, ErrorCode::GuestNameInvalid);
        let details = err.details.unwrap();
        assert_eq!(details.get("field").unwrap(), "fullName");
        assert_eq!(details.get("index").unwrap(), 3);
    }

    #[test]
    fn test_app_error_retryable_follows_code() {
        assert!(AppError::new(ErrorCode::RemoteWriteFailed).is_retryable());
        assert!(!AppError::new(ErrorCode::NotAuthenticated).is_retryable());
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::with_message(ErrorCode::SyncInProgress, "drain already running");
        assert_eq!(format!("{}", err), "drain already running");
    }
}
