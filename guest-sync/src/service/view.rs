//! Observable facade state

use serde::Serialize;
use shared::models::{Guest, GuestStats, SyncState};

/// Everything the UI renders, republished on every change
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestView {
    /// Confirmed snapshot with pending actions applied, ordered by name
    pub guests: Vec<Guest>,
    pub stats: GuestStats,
    pub sync_state: SyncState,
    /// Waiting for the first remote snapshot
    pub loading: bool,
    /// Last facade-level failure
    pub error: Option<String>,
    pub pending_count: usize,
}

impl GuestView {
    pub fn find(&self, id: &str) -> Option<&Guest> {
        self.guests.iter().find(|g| g.id == id)
    }

    pub fn by_table(&self, table_name: &str) -> Vec<Guest> {
        self.guests
            .iter()
            .filter(|g| g.table_name == table_name)
            .cloned()
            .collect()
    }
}

/// One-shot notifications
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GuestNotice {
    /// A batch import was written
    Imported { count: usize },
}
