//! Remote document store
//!
//! ```text
//! RemoteSynchronizer ──► RemoteStore (trait)
//!   │                      ├─ MemoryRemoteStore (in-process)
//!   │                      └─ <hosted document database adapter>
//!   ├─ codec: Guest <-> document fields
//!   └─ AuditService (fire-and-forget)
//! ```
//!
//! Documents are schemaless JSON maps keyed by an opaque id. Writes may
//! carry [`WriteValue::ServerTimestamp`] placeholders that the store
//! resolves to its own clock (epoch millis).

mod codec;
mod memory;
mod synchronizer;

pub use codec::{decode_guest, encode_create, encode_presence, encode_update};
pub use memory::MemoryRemoteStore;
pub use synchronizer::{RemoteSynchronizer, SubscriptionHandle};

use async_trait::async_trait;
use std::collections::BTreeMap;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Stored document fields
pub type DocumentFields = serde_json::Map<String, serde_json::Value>;

/// A field value in a write request
#[derive(Debug, Clone, PartialEq)]
pub enum WriteValue {
    Value(serde_json::Value),
    /// Resolved by the store to its current time
    ServerTimestamp,
}

impl WriteValue {
    pub fn value(value: impl Into<serde_json::Value>) -> Self {
        WriteValue::Value(value.into())
    }
}

/// Fields of a write request
pub type WriteFields = BTreeMap<String, WriteValue>;

/// A document as read from the store
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteDocument {
    pub id: String,
    pub fields: DocumentFields,
}

/// Live query result stream
///
/// Every item is the full, ordered result set. Cancelling the token (or
/// dropping the receiver) ends the subscription.
#[derive(Debug)]
pub struct DocumentStream {
    pub snapshots: mpsc::UnboundedReceiver<Result<Vec<RemoteDocument>, RemoteError>>,
    pub cancel: CancellationToken,
}

/// Remote store errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RemoteError {
    #[error("Remote store unavailable: {0}")]
    Unavailable(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Malformed document {id}: {reason}")]
    Malformed { id: String, reason: String },

    #[error("Remote store error: {0}")]
    Internal(String),
}

impl RemoteError {
    /// Transport-level failure that may succeed on retry
    pub fn is_network(&self) -> bool {
        matches!(self, RemoteError::Unavailable(_))
    }
}

/// Hosted document database
#[async_trait]
pub trait RemoteStore: Send + Sync + std::fmt::Debug {
    /// Obtain an anonymous session; returns the actor id
    async fn sign_in_anonymously(&self) -> Result<String, RemoteError>;

    /// Live query over a collection ordered ascending by `order_by`
    async fn subscribe(&self, collection: &str, order_by: &str)
    -> Result<DocumentStream, RemoteError>;

    /// Insert a document; returns the store-assigned id
    async fn add(&self, collection: &str, fields: WriteFields) -> Result<String, RemoteError>;

    /// Merge fields into an existing document
    async fn update(&self, collection: &str, id: &str, fields: WriteFields)
    -> Result<(), RemoteError>;

    /// Delete a document (succeeds if it does not exist)
    async fn delete(&self, collection: &str, id: &str) -> Result<(), RemoteError>;

    /// One-shot read of a whole collection
    async fn get_all(&self, collection: &str) -> Result<Vec<RemoteDocument>, RemoteError>;

    /// Insert all documents atomically; returns ids in input order
    async fn batch_write(
        &self,
        collection: &str,
        documents: Vec<WriteFields>,
    ) -> Result<Vec<String>, RemoteError>;
}
