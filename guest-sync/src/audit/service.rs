//! Audit producer handle

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::types::{AuditAction, AuditLogRequest};
use super::worker::AuditWorker;
use crate::remote::RemoteStore;

/// Fire-and-forget audit logger
///
/// The guest write has already succeeded when an entry is logged, so a
/// full or closed channel only costs the entry.
#[derive(Debug)]
pub struct AuditService {
    tx: mpsc::Sender<AuditLogRequest>,
}

impl AuditService {
    pub fn new(buffer_size: usize) -> (Arc<Self>, mpsc::Receiver<AuditLogRequest>) {
        let (tx, rx) = mpsc::channel(buffer_size.max(1));
        (Arc::new(Self { tx }), rx)
    }

    /// Create the service and spawn its worker writing to `collection`
    pub fn spawn(
        store: Arc<dyn RemoteStore>,
        collection: impl Into<String>,
        buffer_size: usize,
    ) -> Arc<Self> {
        let (service, rx) = Self::new(buffer_size);
        let worker = AuditWorker::new(store, collection);
        tokio::spawn(worker.run(rx));
        service
    }

    pub fn log(&self, request: AuditLogRequest) {
        let action: AuditAction = request.action;
        match self.tx.try_send(request) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                tracing::warn!(%action, "Audit channel full, entry dropped");
            }
            Err(TrySendError::Closed(_)) => {
                tracing::warn!(%action, "Audit channel closed, entry dropped");
            }
        }
    }
}
