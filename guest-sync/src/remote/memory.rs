//! In-process remote store
//!
//! Behaves like the hosted store for everything the sync core relies on:
//! store-assigned ids, server timestamps, ordered live queries, atomic
//! batches. Connectivity and sign-in can be toggled to exercise the
//! offline and failure paths.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::{
    DocumentFields, DocumentStream, RemoteDocument, RemoteError, RemoteStore, WriteFields,
    WriteValue,
};

type Snapshot = Result<Vec<RemoteDocument>, RemoteError>;

struct Subscriber {
    collection: String,
    order_by: String,
    tx: mpsc::UnboundedSender<Snapshot>,
    cancel: CancellationToken,
}

struct Inner {
    online: bool,
    sign_in_allowed: bool,
    collections: HashMap<String, BTreeMap<String, DocumentFields>>,
    subscribers: Vec<Subscriber>,
    writes: HashMap<String, usize>,
    last_timestamp: i64,
}

impl Inner {
    fn ensure_online(&self) -> Result<(), RemoteError> {
        if self.online {
            Ok(())
        } else {
            Err(RemoteError::Unavailable("client is offline".to_string()))
        }
    }

    /// Strictly increasing server clock
    fn server_time(&mut self) -> i64 {
        let now = shared::util::now_millis().max(self.last_timestamp + 1);
        self.last_timestamp = now;
        now
    }

    fn resolve(&mut self, fields: WriteFields) -> DocumentFields {
        let now = self.server_time();
        fields
            .into_iter()
            .map(|(key, value)| {
                let value = match value {
                    WriteValue::Value(v) => v,
                    WriteValue::ServerTimestamp => Value::from(now),
                };
                (key, value)
            })
            .collect()
    }

    fn snapshot(&self, collection: &str, order_by: &str) -> Vec<RemoteDocument> {
        let mut docs: Vec<RemoteDocument> = self
            .collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, fields)| RemoteDocument {
                        id: id.clone(),
                        fields: fields.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        docs.sort_by(|a, b| compare_field(a.fields.get(order_by), b.fields.get(order_by)));
        docs
    }

    fn record_write(&mut self, collection: &str) {
        *self.writes.entry(collection.to_string()).or_default() += 1;
    }

    /// Push the current result set to every live subscriber of `collection`
    fn notify(&mut self, collection: &str) {
        let mut subscribers = std::mem::take(&mut self.subscribers);
        subscribers.retain(|sub| {
            if sub.cancel.is_cancelled() {
                return false;
            }
            if sub.collection != collection {
                return true;
            }
            let snapshot = self.snapshot(&sub.collection, &sub.order_by);
            sub.tx.send(Ok(snapshot)).is_ok()
        });
        self.subscribers = subscribers;
    }
}

/// Missing values sort first, strings lexicographically, numbers numerically
fn compare_field(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

/// In-memory [`RemoteStore`]
pub struct MemoryRemoteStore {
    inner: Mutex<Inner>,
}

impl std::fmt::Debug for MemoryRemoteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("MemoryRemoteStore")
            .field("online", &inner.online)
            .field("subscribers", &inner.subscribers.len())
            .finish_non_exhaustive()
    }
}

impl Default for MemoryRemoteStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                online: true,
                sign_in_allowed: true,
                collections: HashMap::new(),
                subscribers: Vec::new(),
                writes: HashMap::new(),
                last_timestamp: 0,
            }),
        }
    }

    /// Toggle reachability; every call fails with `Unavailable` while offline
    pub fn set_online(&self, online: bool) {
        self.inner.lock().online = online;
    }

    pub fn set_sign_in_allowed(&self, allowed: bool) {
        self.inner.lock().sign_in_allowed = allowed;
    }

    /// Successful write calls against a collection (a batch counts once)
    pub fn write_count(&self, collection: &str) -> usize {
        self.inner.lock().writes.get(collection).copied().unwrap_or(0)
    }

    /// Current documents of a collection, ordered by id
    pub fn documents(&self, collection: &str) -> Vec<RemoteDocument> {
        self.inner
            .lock()
            .collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, fields)| RemoteDocument {
                        id: id.clone(),
                        fields: fields.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Store a document verbatim and notify subscribers
    pub fn insert_raw(&self, collection: &str, id: &str, fields: DocumentFields) {
        let mut inner = self.inner.lock();
        inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), fields);
        inner.notify(collection);
    }

    /// Deliver an error to every live subscriber of `collection`
    pub fn push_error(&self, collection: &str, error: RemoteError) {
        let inner = self.inner.lock();
        for sub in inner
            .subscribers
            .iter()
            .filter(|s| s.collection == collection && !s.cancel.is_cancelled())
        {
            let _ = sub.tx.send(Err(error.clone()));
        }
    }

    /// Live subscriptions not yet cancelled
    pub fn subscriber_count(&self) -> usize {
        let inner = self.inner.lock();
        inner
            .subscribers
            .iter()
            .filter(|s| !s.cancel.is_cancelled() && !s.tx.is_closed())
            .count()
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn sign_in_anonymously(&self) -> Result<String, RemoteError> {
        let inner = self.inner.lock();
        inner.ensure_online()?;
        if !inner.sign_in_allowed {
            return Err(RemoteError::PermissionDenied(
                "anonymous sign-in disabled".to_string(),
            ));
        }
        Ok(format!("anon-{}", uuid::Uuid::new_v4().simple()))
    }

    async fn subscribe(
        &self,
        collection: &str,
        order_by: &str,
    ) -> Result<DocumentStream, RemoteError> {
        let mut inner = self.inner.lock();
        inner.ensure_online()?;

        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        // Initial result set is delivered immediately
        let _ = tx.send(Ok(inner.snapshot(collection, order_by)));
        inner.subscribers.push(Subscriber {
            collection: collection.to_string(),
            order_by: order_by.to_string(),
            tx,
            cancel: cancel.clone(),
        });

        Ok(DocumentStream {
            snapshots: rx,
            cancel,
        })
    }

    async fn add(&self, collection: &str, fields: WriteFields) -> Result<String, RemoteError> {
        let mut inner = self.inner.lock();
        inner.ensure_online()?;

        let id = uuid::Uuid::new_v4().simple().to_string();
        let doc = inner.resolve(fields);
        inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), doc);
        inner.record_write(collection);
        inner.notify(collection);
        Ok(id)
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: WriteFields,
    ) -> Result<(), RemoteError> {
        let mut inner = self.inner.lock();
        inner.ensure_online()?;

        let exists = inner
            .collections
            .get(collection)
            .is_some_and(|docs| docs.contains_key(id));
        if !exists {
            return Err(RemoteError::NotFound(format!("{collection}/{id}")));
        }

        let resolved = inner.resolve(fields);
        if let Some(doc) = inner
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
        {
            doc.extend(resolved);
        }
        inner.record_write(collection);
        inner.notify(collection);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), RemoteError> {
        let mut inner = self.inner.lock();
        inner.ensure_online()?;

        if let Some(docs) = inner.collections.get_mut(collection) {
            docs.remove(id);
        }
        inner.record_write(collection);
        inner.notify(collection);
        Ok(())
    }

    async fn get_all(&self, collection: &str) -> Result<Vec<RemoteDocument>, RemoteError> {
        let inner = self.inner.lock();
        inner.ensure_online()?;
        Ok(inner.snapshot(collection, "fullName"))
    }

    async fn batch_write(
        &self,
        collection: &str,
        documents: Vec<WriteFields>,
    ) -> Result<Vec<String>, RemoteError> {
        let mut inner = self.inner.lock();
        inner.ensure_online()?;

        // Resolve everything before touching the collection
        let resolved: Vec<(String, DocumentFields)> = documents
            .into_iter()
            .map(|fields| {
                (
                    uuid::Uuid::new_v4().simple().to_string(),
                    inner.resolve(fields),
                )
            })
            .collect();

        let ids = resolved.iter().map(|(id, _)| id.clone()).collect();
        inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .extend(resolved);
        inner.record_write(collection);
        inner.notify(collection);
        Ok(ids)
    }
}
