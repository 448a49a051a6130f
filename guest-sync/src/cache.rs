//! Snapshot cache - last confirmed guest list for offline reads

use shared::models::Guest;
use std::sync::Arc;

use crate::storage::{LocalStorage, StorageResult};

/// Storage key holding the JSON-serialized `Guest[]`
pub const GUESTS_CACHE_KEY: &str = "guests_cache";

#[derive(Debug, Clone)]
pub struct SnapshotCache {
    storage: Arc<dyn LocalStorage>,
}

impl SnapshotCache {
    pub fn new(storage: Arc<dyn LocalStorage>) -> Self {
        Self { storage }
    }

    pub async fn save(&self, guests: &[Guest]) -> StorageResult<()> {
        let json = serde_json::to_string(guests)?;
        self.storage.set(GUESTS_CACHE_KEY, &json).await?;
        tracing::debug!(count = guests.len(), "Guest snapshot cached");
        Ok(())
    }

    /// Last saved snapshot; empty if never saved or unreadable
    pub async fn load(&self) -> Vec<Guest> {
        let raw = match self.storage.get(GUESTS_CACHE_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!("Failed to read guest cache: {e}");
                return Vec::new();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!("Failed to decode guest cache: {e}");
            Vec::new()
        })
    }
}
