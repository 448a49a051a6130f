//! Sync orchestrator - replays the pending queue against the remote store
//!
//! ```text
//! drain()
//!   ├─ reject if a pass is already running
//!   ├─ ensure the remote session exists
//!   ├─ for each queued action (snapshot, queue order):
//!   │    ├─ success → retarget dependents of a confirmed insert, remove
//!   │    └─ failure → retry_count += 1, or evict on the MAX_RETRIES-th failure
//!   │                 (an evicted insert takes its dependents with it)
//!   └─ broadcast SyncReport
//! ```
//!
//! Queue mutations land in memory before they are persisted, so a failed
//! persist is recorded in the report and the pass continues.

use serde::Serialize;
use shared::error::ErrorCode;
use shared::models::{ActionType, PendingAction};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;

use crate::error::{SyncError, SyncResult};
use crate::queue::ActionQueue;
use crate::remote::RemoteSynchronizer;
use crate::storage::StorageResult;

/// Failed replays after which an action is evicted
pub const MAX_RETRIES: u32 = 3;

const REPORT_CHANNEL_CAPACITY: usize = 16;

/// Outcome of one drain pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    /// No replay or persist failed during the pass
    pub success: bool,
    /// Actions confirmed and removed
    pub synced: usize,
    /// Actions that failed and stay queued
    pub retried: usize,
    /// Actions evicted after exhausting their retries, with their dependents
    pub dropped: usize,
    /// Actions not attempted because the insert they target is still pending
    pub deferred: usize,
    pub error: Option<String>,
    /// Most significant failure of the pass
    pub code: Option<ErrorCode>,
    pub finished_at: i64,
}

#[derive(Default)]
struct PassTally {
    synced: usize,
    retried: usize,
    dropped: usize,
    deferred: usize,
    failures: Vec<String>,
    first_failure: Option<ErrorCode>,
    storage_failed: bool,
}

impl PassTally {
    fn persisted(&mut self, action: &PendingAction, result: StorageResult<impl Sized>) {
        if let Err(e) = result {
            tracing::error!(action_id = %action.id, "Failed to persist pending queue: {e}");
            self.storage_failed = true;
            self.failures
                .push(format!("{} {} not persisted: {e}", action.action_type(), action.id));
        }
    }

    fn into_report(self) -> SyncReport {
        let success = self.retried == 0 && self.dropped == 0 && !self.storage_failed;
        let code = if self.dropped > 0 {
            Some(ErrorCode::MaxRetriesExceeded)
        } else if self.storage_failed {
            Some(ErrorCode::StorageError)
        } else {
            self.first_failure
        };
        let error = if success {
            None
        } else {
            let mut summary = format!("{} action(s) failed", self.retried + self.dropped);
            if !self.failures.is_empty() {
                summary.push_str("; ");
                summary.push_str(&self.failures.join("; "));
            }
            Some(summary)
        };

        SyncReport {
            success,
            synced: self.synced,
            retried: self.retried,
            dropped: self.dropped,
            deferred: self.deferred,
            error,
            code,
            finished_at: shared::util::now_millis(),
        }
    }
}

struct DrainGuard<'a>(&'a AtomicBool);

impl<'a> DrainGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug)]
pub struct SyncOrchestrator {
    queue: Arc<ActionQueue>,
    remote: Arc<RemoteSynchronizer>,
    draining: AtomicBool,
    reports: broadcast::Sender<SyncReport>,
}

impl SyncOrchestrator {
    pub fn new(queue: Arc<ActionQueue>, remote: Arc<RemoteSynchronizer>) -> Self {
        let (reports, _) = broadcast::channel(REPORT_CHANNEL_CAPACITY);
        Self {
            queue,
            remote,
            draining: AtomicBool::new(false),
            reports,
        }
    }

    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::SeqCst)
    }

    pub fn has_pending(&self) -> bool {
        !self.queue.is_empty()
    }

    /// Listen for the report of every completed pass
    pub fn subscribe(&self) -> broadcast::Receiver<SyncReport> {
        self.reports.subscribe()
    }

    /// Replay the queue once
    ///
    /// Fails with `DrainInProgress` while another pass runs, and with
    /// `NotAuthenticated` (queue untouched, no pass) when no session can be
    /// opened. Every pass that starts ends with a broadcast report.
    pub async fn drain(&self) -> SyncResult<SyncReport> {
        let _guard = DrainGuard::acquire(&self.draining).ok_or(SyncError::DrainInProgress)?;

        self.remote.initialize().await?;

        let actions = self.queue.list();
        tracing::debug!(count = actions.len(), "Draining pending actions");

        let mut tally = PassTally::default();
        // Temporary ids of inserts that failed during this pass
        let mut unconfirmed: HashSet<String> = HashSet::new();

        for action in actions {
            // Ids may have been retargeted, or the action evicted, since the snapshot
            let Some(action) = self.queue.get(&action.id) else {
                continue;
            };

            if let Some(target) = action.payload.target_guest_id() {
                if unconfirmed.contains(target) {
                    tally.deferred += 1;
                    continue;
                }
            }

            match self.remote.apply_action(&action.payload).await {
                Ok(confirmed_id) => {
                    if let Some(confirmed_id) = confirmed_id {
                        let result = self.queue.rewrite_guest_id(&action.id, &confirmed_id).await;
                        tally.persisted(&action, result);
                    }
                    let result = self.queue.remove(&action.id).await;
                    tally.persisted(&action, result);
                    tally.synced += 1;
                    tracing::debug!(
                        action_id = %action.id,
                        action_type = %action.action_type(),
                        "Pending action synced"
                    );
                }
                Err(e) => {
                    tally.first_failure.get_or_insert(e.error_code());
                    if action.action_type() == ActionType::AddGuest {
                        unconfirmed.insert(action.id.clone());
                    }

                    if action.retry_count + 1 < MAX_RETRIES {
                        let result = self.queue.increment_retry(&action.id).await;
                        tally.persisted(&action, result);
                        tally.retried += 1;
                        tracing::warn!(
                            action_id = %action.id,
                            action_type = %action.action_type(),
                            attempt = action.retry_count + 1,
                            "Pending action failed, will retry: {e}"
                        );
                    } else {
                        self.evict(&action, &e, &mut tally).await;
                    }
                }
            }
        }

        let report = tally.into_report();
        if report.success {
            tracing::debug!(synced = report.synced, "Drain pass completed");
        } else {
            tracing::warn!(
                synced = report.synced,
                retried = report.retried,
                dropped = report.dropped,
                "Drain pass completed with failures"
            );
        }
        // No listeners is fine
        let _ = self.reports.send(report.clone());
        Ok(report)
    }

    /// Drop an action that exhausted its retries
    ///
    /// Actions targeting an evicted insert's temporary id can never resolve
    /// and are dropped with it.
    async fn evict(&self, action: &PendingAction, err: &SyncError, tally: &mut PassTally) {
        let result = self.queue.remove(&action.id).await;
        tally.persisted(action, result);
        tally.dropped += 1;
        tracing::warn!(
            action_id = %action.id,
            action_type = %action.action_type(),
            "Pending action dropped after {MAX_RETRIES} attempts: {err}"
        );
        tally.failures.push(format!(
            "{} {} dropped after {MAX_RETRIES} attempts: {err}",
            action.action_type(),
            action.id
        ));

        if action.action_type() != ActionType::AddGuest {
            return;
        }
        let dependents: Vec<PendingAction> = self
            .queue
            .list()
            .into_iter()
            .filter(|a| a.payload.target_guest_id() == Some(action.id.as_str()))
            .collect();
        for dependent in dependents {
            let result = self.queue.remove(&dependent.id).await;
            tally.persisted(&dependent, result);
            tally.dropped += 1;
            tracing::warn!(
                action_id = %dependent.id,
                action_type = %dependent.action_type(),
                insert_id = %action.id,
                "Pending action dropped with its insert"
            );
            tally.failures.push(format!(
                "{} {} dropped with insert {}",
                dependent.action_type(),
                dependent.id,
                action.id
            ));
        }
    }
}
