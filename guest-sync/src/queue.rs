//! Pending action queue: durable, ordered storage of unconfirmed mutations
//!
//! ```text
//! enqueue/remove/increment_retry/clear/rewrite_guest_id
//!   ├─ 1. mutate in-memory Vec (readers see it immediately)
//!   └─ 2. persist whole Vec as JSON under `pending_actions`
//! ```
//!
//! Insertion order is replay order. Persists are serialized and always
//! write the current in-memory state.

use parking_lot::RwLock;
use shared::models::{ActionPayload, ActionType, PendingAction};
use std::sync::Arc;

use crate::storage::{LocalStorage, StorageResult};

/// Storage key holding the JSON-serialized `PendingAction[]`
pub const PENDING_ACTIONS_KEY: &str = "pending_actions";

pub struct ActionQueue {
    storage: Arc<dyn LocalStorage>,
    actions: RwLock<Vec<PendingAction>>,
    persist_lock: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for ActionQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionQueue")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl ActionQueue {
    /// Create an empty queue (nothing is read from storage)
    pub fn new(storage: Arc<dyn LocalStorage>) -> Self {
        Self::with_actions(storage, Vec::new())
    }

    fn with_actions(storage: Arc<dyn LocalStorage>, actions: Vec<PendingAction>) -> Self {
        Self {
            storage,
            actions: RwLock::new(actions),
            persist_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Restore the queue persisted by a previous process
    ///
    /// A corrupt payload is logged and replaced by an empty queue; storage
    /// read failures propagate.
    pub async fn load(storage: Arc<dyn LocalStorage>) -> StorageResult<Self> {
        let actions = match storage.get(PENDING_ACTIONS_KEY).await? {
            Some(raw) => match serde_json::from_str::<Vec<PendingAction>>(&raw) {
                Ok(actions) => actions,
                Err(e) => {
                    tracing::warn!("Discarding unreadable pending action queue: {e}");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        if !actions.is_empty() {
            tracing::info!(count = actions.len(), "Restored pending actions");
        }
        Ok(Self::with_actions(storage, actions))
    }

    /// Append a new action and persist; returns its id
    pub async fn enqueue(&self, payload: ActionPayload) -> StorageResult<String> {
        let action = {
            let mut actions = self.actions.write();
            let mut action = PendingAction::new(payload.clone());
            // Same-millisecond ids can collide on the random bits
            while actions.iter().any(|a| a.id == action.id) {
                action = PendingAction::new(payload.clone());
            }
            actions.push(action.clone());
            action
        };

        tracing::debug!(
            action_id = %action.id,
            action_type = %action.action_type(),
            "Action queued"
        );
        self.persist().await?;
        Ok(action.id)
    }

    /// Snapshot of the queue in replay order
    pub fn list(&self) -> Vec<PendingAction> {
        self.actions.read().clone()
    }

    pub fn get(&self, id: &str) -> Option<PendingAction> {
        self.actions.read().iter().find(|a| a.id == id).cloned()
    }

    /// Whether a queued action targets `guest_id`, or `guest_id` is the
    /// temporary id of a queued insert
    pub fn has_pending_for(&self, guest_id: &str) -> bool {
        self.actions.read().iter().any(|a| {
            a.payload.target_guest_id() == Some(guest_id)
                || (a.id == guest_id && a.action_type() == ActionType::AddGuest)
        })
    }

    pub fn len(&self) -> usize {
        self.actions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.read().is_empty()
    }

    /// Remove by id (no-op if absent)
    pub async fn remove(&self, id: &str) -> StorageResult<()> {
        let removed = {
            let mut actions = self.actions.write();
            let before = actions.len();
            actions.retain(|a| a.id != id);
            actions.len() != before
        };

        if removed {
            self.persist().await?;
        }
        Ok(())
    }

    /// Record a failed replay attempt (no-op if absent)
    pub async fn increment_retry(&self, id: &str) -> StorageResult<()> {
        let found = {
            let mut actions = self.actions.write();
            match actions.iter_mut().find(|a| a.id == id) {
                Some(action) => {
                    action.retry_count += 1;
                    true
                }
                None => false,
            }
        };

        if found {
            self.persist().await?;
        }
        Ok(())
    }

    /// Drop every pending action
    pub async fn clear(&self) -> StorageResult<()> {
        let dropped = {
            let mut actions = self.actions.write();
            let n = actions.len();
            actions.clear();
            n
        };

        if dropped > 0 {
            tracing::warn!(count = dropped, "Pending action queue cleared");
        }
        self.persist().await
    }

    /// Retarget queued actions from a temporary guest id to its confirmed id
    ///
    /// Returns the number of rewritten actions.
    pub async fn rewrite_guest_id(&self, from: &str, to: &str) -> StorageResult<usize> {
        let rewritten = {
            let mut actions = self.actions.write();
            let mut n = 0;
            for action in actions.iter_mut() {
                if action.payload.retarget(from, to) {
                    n += 1;
                }
            }
            n
        };

        if rewritten > 0 {
            tracing::debug!(from, to, count = rewritten, "Retargeted queued actions");
            self.persist().await?;
        }
        Ok(rewritten)
    }

    async fn persist(&self) -> StorageResult<()> {
        let _guard = self.persist_lock.lock().await;
        let json = {
            let actions = self.actions.read();
            serde_json::to_string(&*actions)?
        };
        self.storage.set(PENDING_ACTIONS_KEY, &json).await
    }
}
