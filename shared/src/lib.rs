//! Shared types for the guest sync workspace
//!
//! Domain models persisted locally and exchanged with the remote store,
//! the unified error code system, and small utilities (time, ids).

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use error::{AppError, ErrorCategory, ErrorCode};
pub use models::{
    ActionPayload, ActionType, Guest, GuestCreate, GuestStats, GuestUpdate, PendingAction,
    SyncState, SyncStatus,
};
