use serde::{Deserialize, Serialize};

/// Sync status of the most recent remote operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    #[default]
    Idle,
    Syncing,
    Success,
    Error,
}

/// Process-local sync state shown by the UI
///
/// Transitions on every remote operation attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    pub status: SyncStatus,
    /// Time of the last successful remote operation (millis)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SyncState {
    pub fn syncing(&self) -> Self {
        Self {
            status: SyncStatus::Syncing,
            last_sync: self.last_sync,
            error: None,
        }
    }

    pub fn succeeded(at: i64) -> Self {
        Self {
            status: SyncStatus::Success,
            last_sync: Some(at),
            error: None,
        }
    }

    pub fn failed(&self, message: impl Into<String>) -> Self {
        Self {
            status: SyncStatus::Error,
            last_sync: self.last_sync,
            error: Some(message.into()),
        }
    }
}
