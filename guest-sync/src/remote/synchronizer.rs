//! Remote synchronizer - validated guest operations against the remote store
//!
//! Owns the anonymous session (actor id), the live guest subscriptions and
//! the last confirmed state used as the audit "before" image.

use parking_lot::{Mutex, RwLock};
use shared::models::{ActionPayload, Guest, GuestCreate, GuestStats, GuestUpdate};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio_util::sync::CancellationToken;

use super::codec::{decode_guest, encode_create, encode_presence, encode_update};
use super::{DocumentStream, RemoteDocument, RemoteStore};
use crate::audit::{AuditAction, AuditLogRequest, AuditService};
use crate::error::{SyncError, SyncResult};
use crate::utils::validation;

/// Guest list ordering of the live subscription
const ORDER_BY: &str = "fullName";

/// Live subscription handle
#[derive(Debug, Clone)]
pub struct SubscriptionHandle {
    id: u64,
    cancel: CancellationToken,
}

impl SubscriptionHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Stop delivering snapshots (idempotent)
    pub fn unsubscribe(&self) {
        self.cancel.cancel();
    }

    pub fn is_active(&self) -> bool {
        !self.cancel.is_cancelled()
    }
}

#[derive(Debug)]
pub struct RemoteSynchronizer {
    store: Arc<dyn RemoteStore>,
    audit: Arc<AuditService>,
    collection: String,
    actor: RwLock<Option<String>>,
    /// Last decoded snapshot by id
    known: Arc<RwLock<HashMap<String, Guest>>>,
    subscriptions: Arc<Mutex<HashMap<u64, CancellationToken>>>,
    next_subscription: AtomicU64,
    /// Set when the last delivered list was a fail-soft empty list
    degraded: Arc<AtomicBool>,
}

impl RemoteSynchronizer {
    pub fn new(
        store: Arc<dyn RemoteStore>,
        audit: Arc<AuditService>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            store,
            audit,
            collection: collection.into(),
            actor: RwLock::new(None),
            known: Arc::new(RwLock::new(HashMap::new())),
            subscriptions: Arc::new(Mutex::new(HashMap::new())),
            next_subscription: AtomicU64::new(1),
            degraded: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Anonymous sign-in; a no-op once a session exists
    pub async fn initialize(&self) -> SyncResult<()> {
        if self.actor.read().is_some() {
            return Ok(());
        }

        let actor_id = self
            .store
            .sign_in_anonymously()
            .await
            .map_err(|e| SyncError::NotAuthenticated(e.to_string()))?;

        tracing::info!(actor_id = %actor_id, "Signed in anonymously");
        *self.actor.write() = Some(actor_id);
        Ok(())
    }

    pub fn actor_id(&self) -> Option<String> {
        self.actor.read().clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.actor.read().is_some()
    }

    /// True when the most recent list handed to a subscriber was a
    /// fail-soft empty list rather than remote data
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::SeqCst)
    }

    fn require_actor(&self) -> SyncResult<String> {
        self.actor_id()
            .ok_or_else(|| SyncError::NotAuthenticated("not signed in".to_string()))
    }

    /// Open a live subscription on the guest collection
    ///
    /// `callback` receives the full list, ordered by name, on every remote
    /// change. Decode and stream errors deliver an empty list. When the
    /// subscription cannot be opened the callback receives an empty list and
    /// the error is returned.
    pub async fn subscribe_to_guests<F>(&self, callback: F) -> SyncResult<SubscriptionHandle>
    where
        F: Fn(Vec<Guest>) + Send + Sync + 'static,
    {
        self.require_actor()?;

        let DocumentStream {
            mut snapshots,
            cancel,
        } = match self.store.subscribe(&self.collection, ORDER_BY).await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!("Guest subscription failed to open: {e}");
                self.degraded.store(true, Ordering::SeqCst);
                callback(Vec::new());
                return Err(SyncError::RemoteRead(e.to_string()));
            }
        };

        let id = self.next_subscription.fetch_add(1, Ordering::SeqCst);
        self.subscriptions.lock().insert(id, cancel.clone());

        let known = self.known.clone();
        let degraded = self.degraded.clone();
        let subscriptions = self.subscriptions.clone();
        let token = cancel.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    item = snapshots.recv() => {
                        let Some(item) = item else { break };
                        let guests = match item.map_err(|e| e.to_string()).and_then(|docs| decode_all(&docs)) {
                            Ok(guests) => {
                                degraded.store(false, Ordering::SeqCst);
                                *known.write() = guests
                                    .iter()
                                    .map(|g| (g.id.clone(), g.clone()))
                                    .collect();
                                guests
                            }
                            Err(e) => {
                                tracing::warn!(subscription = id, "Guest snapshot unusable: {e}");
                                degraded.store(true, Ordering::SeqCst);
                                Vec::new()
                            }
                        };
                        if token.is_cancelled() {
                            break;
                        }
                        callback(guests);
                    }
                }
            }

            subscriptions.lock().remove(&id);
            tracing::debug!(subscription = id, "Guest subscription closed");
        });

        tracing::debug!(subscription = id, collection = %self.collection, "Guest subscription opened");
        Ok(SubscriptionHandle { id, cancel })
    }

    /// Create a guest; returns the store-assigned id
    pub async fn add_guest(&self, data: &GuestCreate) -> SyncResult<String> {
        let data = validation::validate_guest_create(data)?;
        let actor = self.require_actor()?;

        let id = self
            .store
            .add(&self.collection, encode_create(&data, &actor))
            .await
            .map_err(SyncError::remote_write)?;

        tracing::debug!(guest_id = %id, "Guest created");
        self.audit.log(
            AuditLogRequest::new(AuditAction::GuestCreated, actor)
                .guest(id.clone())
                .after(serde_json::to_value(&data).ok()),
        );
        Ok(id)
    }

    pub async fn update_guest(&self, id: &str, changes: &GuestUpdate) -> SyncResult<()> {
        validation::validate_guest_id(id)?;
        let changes = validation::validate_guest_update(changes)?;
        let actor = self.require_actor()?;
        let before = self.known_state(id);

        self.store
            .update(&self.collection, id, encode_update(&changes, &actor))
            .await
            .map_err(SyncError::remote_write)?;

        tracing::debug!(guest_id = %id, "Guest updated");
        self.audit.log(
            AuditLogRequest::new(AuditAction::GuestUpdated, actor)
                .guest(id)
                .before(before)
                .after(serde_json::to_value(&changes).ok()),
        );
        Ok(())
    }

    /// Delete a guest; deleting an unknown id succeeds
    pub async fn delete_guest(&self, id: &str) -> SyncResult<()> {
        validation::validate_guest_id(id)?;
        let actor = self.require_actor()?;
        let before = self.known_state(id);

        self.store
            .delete(&self.collection, id)
            .await
            .map_err(SyncError::remote_write)?;

        tracing::debug!(guest_id = %id, "Guest deleted");
        self.audit.log(
            AuditLogRequest::new(AuditAction::GuestDeleted, actor)
                .guest(id)
                .before(before),
        );
        Ok(())
    }

    pub async fn mark_guest_present(&self, id: &str) -> SyncResult<()> {
        self.set_presence(id, true).await
    }

    pub async fn mark_guest_absent(&self, id: &str) -> SyncResult<()> {
        self.set_presence(id, false).await
    }

    async fn set_presence(&self, id: &str, is_present: bool) -> SyncResult<()> {
        validation::validate_guest_id(id)?;
        let actor = self.require_actor()?;
        let before = self.known_state(id);

        self.store
            .update(&self.collection, id, encode_presence(is_present, &actor))
            .await
            .map_err(SyncError::remote_write)?;

        tracing::debug!(guest_id = %id, is_present, "Guest presence changed");
        let action = if is_present {
            AuditAction::GuestMarkedPresent
        } else {
            AuditAction::GuestMarkedAbsent
        };
        self.audit.log(
            AuditLogRequest::new(action, actor)
                .guest(id)
                .before(before)
                .after(Some(serde_json::json!({ "isPresent": is_present }))),
        );
        Ok(())
    }

    /// One-shot read and aggregate of the whole collection
    pub async fn get_guest_stats(&self) -> SyncResult<GuestStats> {
        self.require_actor()?;

        let docs = self
            .store
            .get_all(&self.collection)
            .await
            .map_err(|e| SyncError::RemoteRead(e.to_string()))?;

        let guests: Vec<Guest> = docs
            .iter()
            .filter_map(|doc| match decode_guest(doc) {
                Ok(guest) => Some(guest),
                Err(e) => {
                    tracing::warn!("Skipping guest in stats: {e}");
                    None
                }
            })
            .collect();
        Ok(GuestStats::from_guests(&guests))
    }

    /// Validate every record, then write them in one atomic batch
    ///
    /// Returns the new ids in input order. Nothing is written if any record
    /// is invalid.
    pub async fn import_guests(&self, guests: &[GuestCreate]) -> SyncResult<Vec<String>> {
        let guests = validation::validate_import(guests)?;
        let actor = self.require_actor()?;
        if guests.is_empty() {
            return Ok(Vec::new());
        }

        let documents = guests.iter().map(|g| encode_create(g, &actor)).collect();
        let ids = self
            .store
            .batch_write(&self.collection, documents)
            .await
            .map_err(SyncError::remote_write)?;

        tracing::info!(count = ids.len(), "Guests imported");
        self.audit.log(
            AuditLogRequest::new(AuditAction::GuestsImported, actor)
                .details(serde_json::json!({ "count": ids.len() })),
        );
        Ok(ids)
    }

    /// Replay one queued payload; returns the new id for inserts
    pub async fn apply_action(&self, payload: &ActionPayload) -> SyncResult<Option<String>> {
        match payload {
            ActionPayload::AddGuest { guest } => self.add_guest(guest).await.map(Some),
            ActionPayload::UpdateGuest { id, changes } => {
                self.update_guest(id, changes).await.map(|_| None)
            }
            ActionPayload::DeleteGuest { guest_id } => {
                self.delete_guest(guest_id).await.map(|_| None)
            }
            ActionPayload::MarkPresent { guest_id } => {
                self.mark_guest_present(guest_id).await.map(|_| None)
            }
            ActionPayload::MarkAbsent { guest_id } => {
                self.mark_guest_absent(guest_id).await.map(|_| None)
            }
        }
    }

    /// Cancel every live subscription (idempotent)
    pub fn cleanup(&self) {
        let tokens: Vec<CancellationToken> = {
            let mut subs = self.subscriptions.lock();
            subs.drain().map(|(_, token)| token).collect()
        };
        if !tokens.is_empty() {
            tracing::debug!(count = tokens.len(), "Cancelling guest subscriptions");
        }
        for token in tokens {
            token.cancel();
        }
    }

    fn known_state(&self, id: &str) -> Option<serde_json::Value> {
        self.known
            .read()
            .get(id)
            .and_then(|g| serde_json::to_value(g).ok())
    }
}

fn decode_all(docs: &[RemoteDocument]) -> Result<Vec<Guest>, String> {
    docs.iter()
        .map(|doc| decode_guest(doc).map_err(|e| e.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{MemoryRemoteStore, RemoteError};
    use std::time::Duration;
    use tokio::sync::mpsc;

    const GUESTS: &str = "guests";

    async fn setup() -> (Arc<MemoryRemoteStore>, RemoteSynchronizer) {
        let store = Arc::new(MemoryRemoteStore::new());
        let (audit, _rx) = AuditService::new(16);
        let sync = RemoteSynchronizer::new(store.clone(), audit, GUESTS);
        sync.initialize().await.unwrap();
        (store, sync)
    }

    async fn next(rx: &mut mpsc::UnboundedReceiver<Vec<Guest>>) -> Vec<Guest> {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn test_requires_initialize() {
        let store = Arc::new(MemoryRemoteStore::new());
        let (audit, _rx) = AuditService::new(16);
        let sync = RemoteSynchronizer::new(store, audit, GUESTS);

        let err = sync
            .add_guest(&GuestCreate::new("Jean Dupont", "Table 1", 0))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::NotAuthenticated(_)));
    }

    #[tokio::test]
    async fn test_initialize_failure_is_not_authenticated() {
        let store = Arc::new(MemoryRemoteStore::new());
        store.set_sign_in_allowed(false);
        let (audit, _rx) = AuditService::new(16);
        let sync = RemoteSynchronizer::new(store, audit, GUESTS);

        let err = sync.initialize().await.unwrap_err();
        assert!(matches!(err, SyncError::NotAuthenticated(_)));
        assert!(sync.actor_id().is_none());
    }

    #[tokio::test]
    async fn test_add_guest_sanitizes_and_stamps() {
        let (store, sync) = setup().await;
        let id = sync
            .add_guest(&GuestCreate::new("  Jean Dupont ", " Table 1", 2))
            .await
            .unwrap();

        let docs = store.documents(GUESTS);
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, id);
        let guest = decode_guest(&docs[0]).unwrap();
        assert_eq!(guest.full_name, "Jean Dupont");
        assert_eq!(guest.table_name, "Table 1");
        assert_eq!(guest.updated_by, sync.actor_id());
        assert!(guest.created_at > 0);
    }

    #[tokio::test]
    async fn test_validation_rejects_before_write() {
        let (store, sync) = setup().await;
        let err = sync
            .add_guest(&GuestCreate::new("J", "Table 1", 0))
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(store.write_count(GUESTS), 0);
    }

    #[tokio::test]
    async fn test_offline_write_is_retryable() {
        let (store, sync) = setup().await;
        store.set_online(false);
        let err = sync.mark_guest_present("g-1").await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_presence_is_idempotent() {
        let (store, sync) = setup().await;
        let id = sync
            .add_guest(&GuestCreate::new("Jean Dupont", "Table 1", 0))
            .await
            .unwrap();

        sync.mark_guest_present(&id).await.unwrap();
        sync.mark_guest_present(&id).await.unwrap();
        let guest = decode_guest(&store.documents(GUESTS)[0]).unwrap();
        assert!(guest.is_present);
    }

    #[tokio::test]
    async fn test_delete_nonexistent_succeeds() {
        let (_store, sync) = setup().await;
        sync.delete_guest("does-not-exist").await.unwrap();
    }

    #[tokio::test]
    async fn test_update_missing_is_not_retryable() {
        let (_store, sync) = setup().await;
        let changes = GuestUpdate {
            companions: Some(1),
            ..Default::default()
        };
        let err = sync.update_guest("missing", &changes).await.unwrap_err();
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_import_is_all_or_nothing() {
        let (store, sync) = setup().await;
        let batch = vec![
            GuestCreate::new("Jean Dupont", "Table 1", 1),
            GuestCreate::new("Marie Curie", "Table 2", 11),
        ];
        let err = sync.import_guests(&batch).await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(store.write_count(GUESTS), 0);

        let ids = sync.import_guests(&batch[..1]).await.unwrap();
        assert_eq!(ids.len(), 1);
        assert_eq!(store.write_count(GUESTS), 1);
    }

    #[tokio::test]
    async fn test_stats() {
        let (_store, sync) = setup().await;
        let a = sync
            .add_guest(&GuestCreate::new("Alice Martin", "Table 1", 2))
            .await
            .unwrap();
        sync.add_guest(&GuestCreate::new("Bruno Petit", "Table 1", 1))
            .await
            .unwrap();
        sync.mark_guest_present(&a).await.unwrap();

        let stats = sync.get_guest_stats().await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.present, 1);
        assert_eq!(stats.present_companions, 2);
    }

    #[tokio::test]
    async fn test_subscription_delivers_ordered_snapshots() {
        let (_store, sync) = setup().await;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = sync
            .subscribe_to_guests(move |guests| {
                let _ = tx.send(guests);
            })
            .await
            .unwrap();
        assert!(next(&mut rx).await.is_empty());

        sync.add_guest(&GuestCreate::new("Zoe Laurent", "Table 3", 0))
            .await
            .unwrap();
        assert_eq!(next(&mut rx).await.len(), 1);
        sync.add_guest(&GuestCreate::new("Adele Roux", "Table 3", 0))
            .await
            .unwrap();
        let names: Vec<String> = next(&mut rx)
            .await
            .into_iter()
            .map(|g| g.full_name)
            .collect();
        assert_eq!(names, vec!["Adele Roux", "Zoe Laurent"]);
        handle.unsubscribe();
    }

    #[tokio::test]
    async fn test_stream_error_delivers_empty_list() {
        let (store, sync) = setup().await;
        sync.add_guest(&GuestCreate::new("Zoe Laurent", "Table 3", 0))
            .await
            .unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let _handle = sync
            .subscribe_to_guests(move |guests| {
                let _ = tx.send(guests);
            })
            .await
            .unwrap();
        assert_eq!(next(&mut rx).await.len(), 1);
        assert!(!sync.is_degraded());

        store.push_error(GUESTS, RemoteError::PermissionDenied("revoked".into()));
        assert!(next(&mut rx).await.is_empty());
        assert!(sync.is_degraded());
    }

    #[tokio::test]
    async fn test_subscribe_failure_delivers_empty_list() {
        let (store, sync) = setup().await;
        store.set_online(false);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let err = sync
            .subscribe_to_guests(move |guests| {
                let _ = tx.send(guests);
            })
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::RemoteRead(_)));
        assert!(next(&mut rx).await.is_empty());
    }

    #[tokio::test]
    async fn test_cleanup_is_idempotent() {
        let (store, sync) = setup().await;
        let handle = sync.subscribe_to_guests(|_| {}).await.unwrap();
        assert_eq!(store.subscriber_count(), 1);

        sync.cleanup();
        sync.cleanup();
        assert!(!handle.is_active());
        assert_eq!(store.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_apply_action_returns_id_for_add() {
        let (_store, sync) = setup().await;
        let id = sync
            .apply_action(&ActionPayload::AddGuest {
                guest: GuestCreate::new("Jean Dupont", "Table 1", 0),
            })
            .await
            .unwrap();
        assert!(id.is_some());

        let none = sync
            .apply_action(&ActionPayload::MarkAbsent {
                guest_id: id.unwrap(),
            })
            .await
            .unwrap();
        assert!(none.is_none());
    }
}
