//! Audit background worker
//!
//! Consumes `AuditLogRequest`s and appends them to the remote audit
//! collection. Exits when every sender is dropped.

use std::sync::Arc;
use tokio::sync::mpsc;

use super::types::AuditLogRequest;
use crate::remote::{RemoteStore, WriteFields, WriteValue};

pub struct AuditWorker {
    store: Arc<dyn RemoteStore>,
    collection: String,
}

impl AuditWorker {
    pub fn new(store: Arc<dyn RemoteStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    /// Run until the channel closes
    pub async fn run(self, mut rx: mpsc::Receiver<AuditLogRequest>) {
        tracing::debug!(collection = %self.collection, "Audit worker started");

        while let Some(req) = rx.recv().await {
            let action = req.action;
            match self.store.add(&self.collection, encode(req)).await {
                Ok(id) => {
                    tracing::debug!(audit_id = %id, %action, "Audit entry recorded");
                }
                Err(e) => {
                    tracing::error!(%action, "Failed to write audit entry: {e}");
                }
            }
        }

        tracing::debug!("Audit channel closed, worker stopping");
    }
}

fn encode(req: AuditLogRequest) -> WriteFields {
    let mut fields = WriteFields::new();
    fields.insert("action".to_string(), WriteValue::value(req.action.to_string()));
    if let Some(guest_id) = req.guest_id {
        fields.insert("guestId".to_string(), WriteValue::value(guest_id));
    }
    fields.insert("actorId".to_string(), WriteValue::value(req.actor_id));
    if let Some(before) = req.before {
        fields.insert("before".to_string(), WriteValue::Value(before));
    }
    if let Some(after) = req.after {
        fields.insert("after".to_string(), WriteValue::Value(after));
    }
    if !req.details.is_null() {
        fields.insert("details".to_string(), WriteValue::Value(req.details));
    }
    fields.insert("timestamp".to_string(), WriteValue::ServerTimestamp);
    fields
}
