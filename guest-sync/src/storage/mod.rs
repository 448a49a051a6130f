//! Local durable key-value storage
//!
//! The sync core persists exactly two keys (see [`crate::queue`] and
//! [`crate::cache`]), each holding a JSON document. Backends only need
//! asynchronous `get`/`set` of whole string values; there are no
//! transactions across keys.
//!
//! - [`RedbStorage`]: embedded redb database (on-disk or in-memory)
//! - [`MemoryStorage`]: process-local map, used by tests

mod memory;
mod redb_store;

pub use memory::MemoryStorage;
pub use redb_store::RedbStorage;

use async_trait::async_trait;
use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Asynchronous string key-value store
#[async_trait]
pub trait LocalStorage: Send + Sync + std::fmt::Debug {
    async fn get(&self, key: &str) -> StorageResult<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> StorageResult<()>;
}
