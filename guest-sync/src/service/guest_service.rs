//! GuestService - offline-first guest operations
//!
//! ```text
//! write ──► validate ──┬─ online ──► RemoteSynchronizer ──┬─ ok  → SyncState success
//!                      │                                   └─ err → SyncState error
//!                      │                                            (+ enqueue if network)
//!                      └─ offline / guest has queued actions ──► ActionQueue
//!
//! event loop: subscription snapshots │ drain reports │ connectivity │ shutdown
//!               └─► recompute GuestView = project(snapshot, queue)
//! ```
//!
//! Every view update goes through `publish`, which is a no-op once the
//! service is shut down.

use parking_lot::{Mutex, RwLock};
use shared::models::{
    ActionPayload, Guest, GuestCreate, GuestStats, GuestUpdate, PendingAction, SyncState,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::view::{GuestNotice, GuestView};
use crate::audit::AuditService;
use crate::cache::SnapshotCache;
use crate::core::Config;
use crate::error::{SyncError, SyncResult};
use crate::projector::project;
use crate::queue::ActionQueue;
use crate::remote::{RemoteStore, RemoteSynchronizer, SubscriptionHandle};
use crate::storage::LocalStorage;
use crate::sync::{Connectivity, SyncOrchestrator, SyncReport, SyncWorker};
use crate::utils::validation;

const NOTICE_CHANNEL_CAPACITY: usize = 16;

/// One list handed over by the guest subscription
#[derive(Debug)]
struct Delivery {
    guests: Vec<Guest>,
    /// Empty list standing in for a failed snapshot, captured at delivery
    fail_soft: bool,
}

/// Offline-first guest facade
///
/// Cheap to clone; all clones share one state.
#[derive(Clone)]
pub struct GuestService {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for GuestService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuestService")
            .field("mounted", &self.inner.mounted.load(Ordering::SeqCst))
            .field("pending", &self.inner.queue.len())
            .finish_non_exhaustive()
    }
}

struct Inner {
    remote: Arc<RemoteSynchronizer>,
    queue: Arc<ActionQueue>,
    cache: SnapshotCache,
    orchestrator: Arc<SyncOrchestrator>,
    connectivity: Connectivity,
    sync_interval: Duration,
    /// Last confirmed remote list
    snapshot: RwLock<Vec<Guest>>,
    view: watch::Sender<GuestView>,
    notices: broadcast::Sender<GuestNotice>,
    snapshot_tx: mpsc::UnboundedSender<Delivery>,
    snapshot_rx: Mutex<Option<mpsc::UnboundedReceiver<Delivery>>>,
    subscription: Mutex<Option<SubscriptionHandle>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    mounted: AtomicBool,
    shutdown: CancellationToken,
}

impl GuestService {
    /// Wire up the sync core and restore the persisted queue
    ///
    /// Spawns the audit worker; nothing touches the remote store until
    /// [`start`](Self::start).
    pub async fn new(
        config: &Config,
        store: Arc<dyn RemoteStore>,
        storage: Arc<dyn LocalStorage>,
        connectivity: Connectivity,
    ) -> SyncResult<Self> {
        let audit = AuditService::spawn(
            store.clone(),
            config.audit_collection.clone(),
            config.audit_buffer_size,
        );
        let remote = Arc::new(RemoteSynchronizer::new(
            store,
            audit,
            config.guests_collection.clone(),
        ));
        let queue = Arc::new(ActionQueue::load(storage.clone()).await?);
        let orchestrator = Arc::new(SyncOrchestrator::new(queue.clone(), remote.clone()));

        let (view, _) = watch::channel(GuestView {
            loading: true,
            pending_count: queue.len(),
            ..Default::default()
        });
        let (notices, _) = broadcast::channel(NOTICE_CHANNEL_CAPACITY);
        let (snapshot_tx, snapshot_rx) = mpsc::unbounded_channel();

        Ok(Self {
            inner: Arc::new(Inner {
                remote,
                queue,
                cache: SnapshotCache::new(storage),
                orchestrator,
                connectivity,
                sync_interval: Duration::from_secs(config.sync_interval_secs),
                snapshot: RwLock::new(Vec::new()),
                view,
                notices,
                snapshot_tx,
                snapshot_rx: Mutex::new(Some(snapshot_rx)),
                subscription: Mutex::new(None),
                tasks: Mutex::new(Vec::new()),
                mounted: AtomicBool::new(true),
                shutdown: CancellationToken::new(),
            }),
        })
    }

    /// Load the cached snapshot, connect if online, spawn background tasks
    ///
    /// Fails with `NotAuthenticated` when online and the anonymous session
    /// cannot be opened; nothing is spawned then, so no background drain
    /// retries the sign-in. Starting offline succeeds; the session and the
    /// subscription are opened on the next offline → online transition.
    pub async fn start(&self) -> SyncResult<()> {
        if self.inner.snapshot_rx.lock().is_none() {
            tracing::debug!("GuestService already started");
            return Ok(());
        }

        let cached = self.inner.cache.load().await;
        tracing::info!(
            cached = cached.len(),
            pending = self.inner.queue.len(),
            "GuestService starting"
        );
        *self.inner.snapshot.write() = cached;

        // Receivers are created before `online` is read so no transition is missed
        let online_rx = self.inner.connectivity.subscribe();
        let reports = self.inner.orchestrator.subscribe();
        let online = *online_rx.borrow();

        if online {
            if let Err(e) = self.inner.remote.initialize().await {
                tracing::error!("Anonymous sign-in failed: {e}");
                self.inner.recompute(|view| view.loading = false);
                self.inner.record_failure(&e);
                return Err(e);
            }
        }

        let Some(snapshot_rx) = self.inner.snapshot_rx.lock().take() else {
            return Ok(());
        };
        self.inner.recompute(|view| view.loading = online);

        let event_loop = tokio::spawn(self.inner.clone().run(
            snapshot_rx,
            reports,
            online_rx,
            online,
        ));
        let worker = SyncWorker::new(
            self.inner.orchestrator.clone(),
            self.inner.connectivity.clone(),
            self.inner.sync_interval,
            self.inner.shutdown.child_token(),
        );
        let worker = tokio::spawn(worker.run());
        self.inner.tasks.lock().extend([event_loop, worker]);

        if online {
            self.inner.open_subscription().await;
        }
        Ok(())
    }

    // ========== Writes ==========

    /// Create a guest; returns the confirmed id, or the temporary id when queued
    pub async fn add_guest(&self, data: GuestCreate) -> SyncResult<String> {
        let guest = self.inner.validated(validation::validate_guest_create(&data))?;
        let id = self.inner.execute(ActionPayload::AddGuest { guest }).await?;
        Ok(id.unwrap_or_default())
    }

    pub async fn update_guest(&self, id: &str, changes: GuestUpdate) -> SyncResult<()> {
        self.inner.validated(validation::validate_guest_id(id))?;
        let changes = self.inner.validated(validation::validate_guest_update(&changes))?;
        self.inner
            .execute(ActionPayload::UpdateGuest {
                id: id.to_string(),
                changes,
            })
            .await
            .map(|_| ())
    }

    pub async fn delete_guest(&self, id: &str) -> SyncResult<()> {
        self.inner.validated(validation::validate_guest_id(id))?;
        self.inner
            .execute(ActionPayload::DeleteGuest {
                guest_id: id.to_string(),
            })
            .await
            .map(|_| ())
    }

    pub async fn mark_present(&self, id: &str) -> SyncResult<()> {
        self.inner.validated(validation::validate_guest_id(id))?;
        self.inner
            .execute(ActionPayload::MarkPresent {
                guest_id: id.to_string(),
            })
            .await
            .map(|_| ())
    }

    pub async fn mark_absent(&self, id: &str) -> SyncResult<()> {
        self.inner.validated(validation::validate_guest_id(id))?;
        self.inner
            .execute(ActionPayload::MarkAbsent {
                guest_id: id.to_string(),
            })
            .await
            .map(|_| ())
    }

    /// All-or-nothing batch create
    ///
    /// Imports are never queued: an atomic batch cannot be replayed as
    /// individual inserts.
    pub async fn import_guests(&self, guests: Vec<GuestCreate>) -> SyncResult<Vec<String>> {
        let guests = self.inner.validated(validation::validate_import(&guests))?;
        if !self.inner.is_connected() {
            let err = SyncError::Offline;
            self.inner.record_failure(&err);
            return Err(err);
        }

        self.inner.set_sync_state(|s| s.syncing());
        match self.inner.remote.import_guests(&guests).await {
            Ok(ids) => {
                self.inner.set_sync_state(|_| SyncState::succeeded(shared::util::now_millis()));
                if self.inner.is_mounted() {
                    let _ = self
                        .inner
                        .notices
                        .send(GuestNotice::Imported { count: ids.len() });
                }
                Ok(ids)
            }
            Err(e) => {
                self.inner.record_failure(&e);
                Err(e)
            }
        }
    }

    // ========== Reads ==========

    /// Current merged view
    pub fn view(&self) -> GuestView {
        self.inner.view.borrow().clone()
    }

    pub fn find_guest_by_id(&self, id: &str) -> Option<Guest> {
        self.inner.view.borrow().find(id).cloned()
    }

    pub fn find_guests_by_table(&self, table_name: &str) -> Vec<Guest> {
        self.inner.view.borrow().by_table(table_name)
    }

    pub fn pending_actions(&self) -> Vec<PendingAction> {
        self.inner.queue.list()
    }

    /// Authoritative counts straight from the remote store (pending actions
    /// excluded)
    pub async fn refresh_stats(&self) -> SyncResult<GuestStats> {
        if !self.inner.is_connected() {
            return Err(SyncError::Offline);
        }
        self.inner.remote.get_guest_stats().await.inspect_err(|e| {
            self.inner.record_failure(e);
        })
    }

    // ========== Sync control ==========

    /// Drain the pending queue now
    pub async fn sync_now(&self) -> SyncResult<SyncReport> {
        if !self.inner.connectivity.is_online() {
            return Err(SyncError::Offline);
        }
        self.inner.set_sync_state(|s| s.syncing());
        match self.inner.orchestrator.drain().await {
            Ok(report) => {
                self.inner.apply_report(&report);
                Ok(report)
            }
            Err(e) => {
                if !matches!(e, SyncError::DrainInProgress) {
                    self.inner.record_failure(&e);
                }
                Err(e)
            }
        }
    }

    /// Drop every pending action and republish the view
    pub async fn clear_pending(&self) -> SyncResult<()> {
        self.inner.queue.clear().await?;
        self.inner.recompute(|_| {});
        Ok(())
    }

    // ========== Observation ==========

    pub fn subscribe(&self) -> watch::Receiver<GuestView> {
        self.inner.view.subscribe()
    }

    pub fn subscribe_notices(&self) -> broadcast::Receiver<GuestNotice> {
        self.inner.notices.subscribe()
    }

    pub fn subscribe_sync_reports(&self) -> broadcast::Receiver<SyncReport> {
        self.inner.orchestrator.subscribe()
    }

    /// Stop background tasks and subscriptions; no view update follows
    pub async fn shutdown(&self) {
        if !self.inner.mounted.swap(false, Ordering::SeqCst) {
            return;
        }
        tracing::info!("GuestService shutting down");

        self.inner.shutdown.cancel();
        if let Some(handle) = self.inner.subscription.lock().take() {
            handle.unsubscribe();
        }
        self.inner.remote.cleanup();

        let tasks: Vec<JoinHandle<()>> = self.inner.tasks.lock().drain(..).collect();
        for task in tasks {
            if let Err(e) = task.await {
                tracing::warn!("Background task ended abnormally: {e}");
            }
        }
    }
}

impl Inner {
    fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }

    fn is_connected(&self) -> bool {
        self.connectivity.is_online() && self.remote.is_initialized()
    }

    /// Surface validation failures in the view before returning them
    fn validated<T>(&self, result: SyncResult<T>) -> SyncResult<T> {
        result.inspect_err(|e| self.record_failure(e))
    }

    /// Queue when offline, or when older queued actions concern the same
    /// guest: the write must replay after them, not before
    fn should_queue(&self, payload: &ActionPayload) -> bool {
        if !self.is_connected() {
            return true;
        }
        payload
            .target_guest_id()
            .is_some_and(|id| self.queue.has_pending_for(id))
    }

    /// Route one validated write; returns the new id for inserts
    async fn execute(&self, payload: ActionPayload) -> SyncResult<Option<String>> {
        if self.should_queue(&payload) {
            let id = self.enqueue(payload).await?;
            if self.is_connected() {
                self.request_drain();
            }
            return Ok(Some(id));
        }

        self.set_sync_state(|s| s.syncing());
        match self.remote.apply_action(&payload).await {
            Ok(id) => {
                self.set_sync_state(|_| SyncState::succeeded(shared::util::now_millis()));
                Ok(id)
            }
            Err(e) => {
                self.record_failure(&e);
                if e.is_retryable() {
                    if let Err(storage_err) = self.enqueue(payload).await {
                        tracing::error!("Failed to queue action after remote failure: {storage_err}");
                    }
                }
                Err(e)
            }
        }
    }

    /// Replay the queue in the background; the report reaches the event loop
    fn request_drain(&self) {
        let orchestrator = self.orchestrator.clone();
        tokio::spawn(async move {
            match orchestrator.drain().await {
                Ok(_) | Err(SyncError::DrainInProgress) => {}
                Err(e) => tracing::warn!("Background drain failed: {e}"),
            }
        });
    }

    async fn enqueue(&self, payload: ActionPayload) -> SyncResult<String> {
        let result = self.queue.enqueue(payload).await;
        // In-memory queue already holds the action even if the persist failed
        self.recompute(|_| {});
        Ok(result?)
    }

    fn record_failure(&self, err: &SyncError) {
        let message = err.to_string();
        self.publish(|view| {
            view.sync_state = view.sync_state.failed(message.clone());
            view.error = Some(message);
        });
    }

    fn set_sync_state(&self, next: impl FnOnce(&SyncState) -> SyncState) {
        self.publish(|view| {
            view.sync_state = next(&view.sync_state);
            if view.sync_state.error.is_none() {
                view.error = None;
            }
        });
    }

    fn apply_report(&self, report: &SyncReport) {
        self.recompute(|view| match &report.error {
            None => {
                view.sync_state = SyncState::succeeded(report.finished_at);
                view.error = None;
            }
            Some(message) => {
                view.sync_state = view.sync_state.failed(message.clone());
                view.error = Some(message.clone());
            }
        });
    }

    /// Re-derive guests and stats, then apply `extra` in the same update
    fn recompute(&self, extra: impl FnOnce(&mut GuestView)) {
        if !self.is_mounted() {
            return;
        }
        let pending = self.queue.list();
        let mut guests = project(&self.snapshot.read(), &pending);
        guests.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        let stats = GuestStats::from_guests(&guests);

        self.publish(|view| {
            view.guests = guests;
            view.stats = stats;
            view.pending_count = pending.len();
            extra(view);
        });
    }

    fn publish(&self, update: impl FnOnce(&mut GuestView)) {
        if !self.is_mounted() {
            return;
        }
        self.view.send_modify(update);
    }

    async fn open_subscription(&self) {
        let existing = self.subscription.lock().clone();
        if existing.is_some_and(|h| h.is_active()) {
            return;
        }

        let tx = self.snapshot_tx.clone();
        let remote = Arc::downgrade(&self.remote);
        let result = self
            .remote
            .subscribe_to_guests(move |guests| {
                // The synchronizer flags a fail-soft list right before handing it over
                let fail_soft =
                    guests.is_empty() && remote.upgrade().is_some_and(|r| r.is_degraded());
                let _ = tx.send(Delivery { guests, fail_soft });
            })
            .await;

        match result {
            Ok(handle) => {
                *self.subscription.lock() = Some(handle);
            }
            Err(e) => {
                tracing::warn!("Guest subscription unavailable, showing cached data: {e}");
            }
        }
    }

    async fn on_snapshot(&self, Delivery { guests, fail_soft }: Delivery) {
        if !self.is_mounted() {
            return;
        }

        if fail_soft {
            tracing::warn!("Ignoring fail-soft empty guest list, keeping last snapshot");
            self.recompute(|view| view.loading = false);
            return;
        }

        if let Err(e) = self.cache.save(&guests).await {
            tracing::warn!("Failed to cache guest snapshot: {e}");
        }
        *self.snapshot.write() = guests;
        self.recompute(|view| view.loading = false);
    }

    async fn on_connectivity(&self, online: bool) {
        if !online {
            return;
        }
        if let Err(e) = self.remote.initialize().await {
            tracing::warn!("Sign-in after reconnect failed: {e}");
            self.record_failure(&e);
            return;
        }
        self.open_subscription().await;
    }

    async fn run(
        self: Arc<Self>,
        mut snapshot_rx: mpsc::UnboundedReceiver<Delivery>,
        mut reports: broadcast::Receiver<SyncReport>,
        mut online_rx: watch::Receiver<bool>,
        mut was_online: bool,
    ) {
        loop {
            tokio::select! {
                biased;

                _ = self.shutdown.cancelled() => break,

                Some(delivery) = snapshot_rx.recv() => {
                    self.on_snapshot(delivery).await;
                }

                report = reports.recv() => match report {
                    Ok(report) => self.apply_report(&report),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::debug!(skipped = n, "Sync reports lagged");
                        self.recompute(|_| {});
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },

                changed = online_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let online = *online_rx.borrow_and_update();
                    if online && !was_online {
                        self.on_connectivity(true).await;
                    }
                    was_online = online;
                }
            }
        }

        tracing::debug!("GuestService event loop stopped");
    }
}
