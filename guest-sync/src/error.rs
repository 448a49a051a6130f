//! Sync core error taxonomy
//!
//! | Variant | Queued for replay | Surfaced to caller |
//! |---------|-------------------|--------------------|
//! | `Validation` | never | immediately |
//! | `NotAuthenticated` | never | fatal at startup |
//! | `RemoteWrite` | when network-classified | yes |
//! | `RemoteRead` | n/a | one-shot reads only, subscriptions fail soft |
//! | `Offline` | n/a | operations that need the remote store right now |
//! | `DrainInProgress` | n/a | yes |
//! | `Storage` | n/a | yes |
//!
//! Max-retry eviction and audit log failures are never raised: the former is
//! reported through [`crate::sync::SyncReport`], the latter only logged.

use shared::error::{AppError, ErrorCode};
use thiserror::Error;

use crate::remote::RemoteError;
use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum SyncError {
    /// `code` names the offending field or batch when known
    #[error("Validation error: {message}")]
    Validation { code: ErrorCode, message: String },

    #[error("Not authenticated: {0}")]
    NotAuthenticated(String),

    #[error("Remote write failed: {0}")]
    RemoteWrite(#[source] RemoteError),

    #[error("Remote read failed: {0}")]
    RemoteRead(String),

    #[error("Remote store unreachable")]
    Offline,

    #[error("Synchronization already in progress")]
    DrainInProgress,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type SyncResult<T> = Result<T, SyncError>;

impl SyncError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::invalid(ErrorCode::ValidationFailed, msg)
    }

    pub fn invalid(code: ErrorCode, msg: impl Into<String>) -> Self {
        Self::Validation {
            code,
            message: msg.into(),
        }
    }

    pub fn remote_write(err: RemoteError) -> Self {
        Self::RemoteWrite(err)
    }

    /// Whether the failure is network-classified and worth queueing
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RemoteWrite(e) if e.is_network())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Validation { code, .. } => *code,
            Self::NotAuthenticated(_) => ErrorCode::NotAuthenticated,
            Self::RemoteWrite(RemoteError::NotFound(_)) => ErrorCode::GuestNotFound,
            Self::RemoteWrite(e) if e.is_network() => ErrorCode::RemoteWriteFailed,
            Self::RemoteWrite(_) => ErrorCode::InvalidRequest,
            Self::RemoteRead(_) => ErrorCode::RemoteReadFailed,
            Self::Offline => ErrorCode::NetworkError,
            Self::DrainInProgress => ErrorCode::SyncInProgress,
            Self::Storage(StorageError::Serialization(_)) => ErrorCode::StorageCorrupted,
            Self::Storage(_) => ErrorCode::StorageError,
        }
    }
}

impl From<SyncError> for AppError {
    fn from(err: SyncError) -> Self {
        let code = err.error_code();
        AppError::with_message(code, err.to_string())
            .with_detail("category", code.category().name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_failures_are_retryable() {
        let err = SyncError::remote_write(RemoteError::Unavailable("offline".into()));
        assert!(err.is_retryable());

        let err = SyncError::remote_write(RemoteError::PermissionDenied("rules".into()));
        assert!(!err.is_retryable());
        assert!(!SyncError::validation("bad").is_retryable());
    }

    #[test]
    fn test_into_app_error() {
        let app: AppError = SyncError::validation("Full name is too short").into();
        assert_eq!(app.code, ErrorCode::ValidationFailed);
        assert_eq!(app.message, "Validation error: Full name is too short");
        let details = app.details.unwrap_or_default();
        assert_eq!(details["category"], "general");

        let app: AppError = SyncError::DrainInProgress.into();
        assert_eq!(app.code, ErrorCode::SyncInProgress);

        let app: AppError =
            SyncError::remote_write(RemoteError::Unavailable("offline".into())).into();
        assert!(app.is_retryable());
    }

    #[test]
    fn test_codes_name_the_cause() {
        let err = SyncError::remote_write(RemoteError::NotFound("g-404".into()));
        assert_eq!(err.error_code(), ErrorCode::GuestNotFound);
        assert!(!err.is_retryable());

        let err = SyncError::remote_write(RemoteError::PermissionDenied("rules".into()));
        assert_eq!(err.error_code(), ErrorCode::InvalidRequest);

        let app: AppError = SyncError::invalid(ErrorCode::CompanionsOutOfRange, "too many").into();
        assert_eq!(app.code, ErrorCode::CompanionsOutOfRange);
        assert_eq!(app.details.unwrap_or_default()["category"], "guest");
    }
}
