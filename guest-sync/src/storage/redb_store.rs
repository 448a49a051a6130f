//! redb-backed key-value storage
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `kv` | `&str` | `&str` | Whole JSON documents (pending actions, guest cache) |
//!
//! # Durability
//!
//! redb commits with `Durability::Immediate` by default: a value is on disk
//! once `set` returns, and the file stays consistent across power loss.
//! Mobile processes get killed without warning, so pending actions must not
//! sit in an unflushed buffer.

use async_trait::async_trait;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::path::Path;
use std::sync::Arc;

use super::{LocalStorage, StorageResult};

/// Key-value table: key = storage key, value = JSON document
const KV_TABLE: TableDefinition<&str, &str> = TableDefinition::new("kv");

/// Local storage backed by redb
#[derive(Clone)]
pub struct RedbStorage {
    db: Arc<Database>,
}

impl std::fmt::Debug for RedbStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStorage").finish_non_exhaustive()
    }
}

impl RedbStorage {
    /// Open or create the database at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StorageResult<Self> {
        // Create the table up front so read transactions never see it missing
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(KV_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }
}

#[async_trait]
impl LocalStorage for RedbStorage {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(KV_TABLE)?;
        Ok(table.get(key)?.map(|guard| guard.value().to_string()))
    }

    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(KV_TABLE)?;
            table.insert(key, value)?;
        }
        txn.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_missing_key() {
        let storage = RedbStorage::open_in_memory().unwrap();
        assert!(storage.get("pending_actions").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let storage = RedbStorage::open_in_memory().unwrap();
        storage.set("k", "[1]").await.unwrap();
        storage.set("k", "[1,2]").await.unwrap();
        assert_eq!(storage.get("k").await.unwrap().as_deref(), Some("[1,2]"));
    }

    #[tokio::test]
    async fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("guests.redb");

        {
            let storage = RedbStorage::open(&path).unwrap();
            storage.set("guests_cache", "[]").await.unwrap();
        }

        let storage = RedbStorage::open(&path).unwrap();
        assert_eq!(
            storage.get("guests_cache").await.unwrap().as_deref(),
            Some("[]")
        );
    }
}
