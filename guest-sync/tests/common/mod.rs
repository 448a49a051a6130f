#![allow(dead_code)]

use async_trait::async_trait;
use guest_sync::remote::{DocumentStream, RemoteDocument, RemoteError, WriteFields};
use guest_sync::{
    Config, Connectivity, GuestService, GuestView, LocalStorage, MemoryRemoteStore,
    MemoryStorage, RemoteStore,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

pub const GUESTS: &str = "guests";
pub const AUDIT: &str = "audit_logs";
pub const WAIT: Duration = Duration::from_secs(5);

pub fn config() -> Config {
    let mut config = Config::with_work_dir("unused");
    config.guests_collection = GUESTS.to_string();
    config.audit_collection = AUDIT.to_string();
    config.sync_interval_secs = 3600;
    config
}

pub struct Harness {
    pub store: Arc<MemoryRemoteStore>,
    pub connectivity: Connectivity,
    pub service: GuestService,
}

impl Harness {
    pub async fn start(online: bool) -> Self {
        Self::start_with_storage(online, Arc::new(MemoryStorage::new())).await
    }

    pub async fn start_with_storage(online: bool, storage: Arc<dyn LocalStorage>) -> Self {
        let store = Arc::new(MemoryRemoteStore::new());
        store.set_online(online);
        let connectivity = Connectivity::new(online);
        let service = GuestService::new(&config(), store.clone(), storage, connectivity.clone())
            .await
            .expect("service");
        service.start().await.expect("start");
        Self {
            store,
            connectivity,
            service,
        }
    }

    /// Bring both the store and the connectivity signal online
    pub fn go_online(&self) {
        self.store.set_online(true);
        self.connectivity.set_online(true);
    }

    pub fn go_offline(&self) {
        self.connectivity.set_online(false);
        self.store.set_online(false);
    }

    pub async fn wait_view(&self, pred: impl FnMut(&GuestView) -> bool) -> GuestView {
        let mut rx = self.service.subscribe();
        wait_for(&mut rx, pred).await
    }
}

pub async fn wait_for(
    rx: &mut watch::Receiver<GuestView>,
    pred: impl FnMut(&GuestView) -> bool,
) -> GuestView {
    tokio::time::timeout(WAIT, rx.wait_for(pred))
        .await
        .expect("timed out waiting for view")
        .expect("view channel closed")
        .clone()
}

/// Remote store that delays every write
#[derive(Debug)]
pub struct SlowStore {
    pub inner: MemoryRemoteStore,
    pub delay: Duration,
}

impl SlowStore {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: MemoryRemoteStore::new(),
            delay,
        }
    }
}

#[async_trait]
impl RemoteStore for SlowStore {
    async fn sign_in_anonymously(&self) -> Result<String, RemoteError> {
        self.inner.sign_in_anonymously().await
    }

    async fn subscribe(
        &self,
        collection: &str,
        order_by: &str,
    ) -> Result<DocumentStream, RemoteError> {
        self.inner.subscribe(collection, order_by).await
    }

    async fn add(&self, collection: &str, fields: WriteFields) -> Result<String, RemoteError> {
        tokio::time::sleep(self.delay).await;
        self.inner.add(collection, fields).await
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: WriteFields,
    ) -> Result<(), RemoteError> {
        tokio::time::sleep(self.delay).await;
        self.inner.update(collection, id, fields).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), RemoteError> {
        tokio::time::sleep(self.delay).await;
        self.inner.delete(collection, id).await
    }

    async fn get_all(&self, collection: &str) -> Result<Vec<RemoteDocument>, RemoteError> {
        self.inner.get_all(collection).await
    }

    async fn batch_write(
        &self,
        collection: &str,
        documents: Vec<WriteFields>,
    ) -> Result<Vec<String>, RemoteError> {
        tokio::time::sleep(self.delay).await;
        self.inner.batch_write(collection, documents).await
    }
}
