//! Key/value storage seam
//!
//! The engine persists exactly two collections, each stored wholesale under
//! one string key as a JSON array:
//!
//! | Key | Value |
//! |-----|-------|
//! | `tags` | JSON array of tag records |
//! | `tag_item_relations` | JSON array of relation records |
//!
//! A `set` replaces the whole collection for its key and is all-or-nothing
//! for that key; there is no primitive spanning both keys, so multi-step
//! flows compensate instead of aborting (see the chain materializer).
//! Repositories layer caching and typed access on top of this seam.

use async_trait::async_trait;
use parking_lot::RwLock;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use thiserror::Error;

/// Collection key for tag records
pub const TAGS_KEY: &str = "tags";

/// Collection key for tag-to-bookmark relation records
pub const RELATIONS_KEY: &str = "tag_item_relations";

/// Table for collections: key = collection name, value = JSON array bytes
const COLLECTIONS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("collections");

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

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Asynchronous key/value store holding JSON array collections
///
/// `get` of a key that was never set returns an empty array. `set` replaces
/// that key's whole collection atomically from the caller's point of view.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> StorageResult<Vec<serde_json::Value>>;

    async fn set(&self, key: &str, records: Vec<serde_json::Value>) -> StorageResult<()>;
}

/// Collection store backed by redb
///
/// redb commits with `Durability::Immediate`: once `set` returns, the new
/// collection survives process death, and a torn write can never be observed
/// (copy-on-write with atomic root swap).
#[derive(Clone)]
pub struct RedbKeyValueStore {
    db: Arc<Database>,
}

impl RedbKeyValueStore {
    /// Open or create the database at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;

        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(COLLECTIONS_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;

        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(COLLECTIONS_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }
}

#[async_trait]
impl KeyValueStore for RedbKeyValueStore {
    async fn get(&self, key: &str) -> StorageResult<Vec<serde_json::Value>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(COLLECTIONS_TABLE)?;

        match table.get(key)? {
            Some(value) => Ok(serde_json::from_slice(value.value())?),
            None => Ok(Vec::new()),
        }
    }

    async fn set(&self, key: &str, records: Vec<serde_json::Value>) -> StorageResult<()> {
        let value = serde_json::to_vec(&records)?;

        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(COLLECTIONS_TABLE)?;
            table.insert(key, value.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }
}

/// In-memory store for tests and ephemeral embedding
///
/// Mirrors the observable contract of [`RedbKeyValueStore`] and adds the
/// hooks the repository tests need: a counter of reads that reached the
/// store, toggleable read failure, and one-shot write failure.
#[derive(Default)]
pub struct MemoryKeyValueStore {
    collections: RwLock<HashMap<String, Vec<serde_json::Value>>>,
    reads: AtomicU64,
    sets: AtomicU64,
    fail_reads: AtomicBool,
    /// 1-based `set` ordinal to fail once; 0 = disabled
    fail_on_set: AtomicU64,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `get` calls that reached the store
    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of `set` calls that reached the store
    pub fn set_count(&self) -> u64 {
        self.sets.load(Ordering::SeqCst)
    }

    /// Make every subsequent `get` fail until cleared
    pub fn set_read_failure(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Fail exactly the `n`-th `set` from now (1-based), then recover
    pub fn fail_once_on_set(&self, n: u64) {
        self.sets.store(0, Ordering::SeqCst);
        self.fail_on_set.store(n, Ordering::SeqCst);
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> StorageResult<Vec<serde_json::Value>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable(
                "injected read failure".to_string(),
            ));
        }
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.collections.read().get(key).cloned().unwrap_or_default())
    }

    async fn set(&self, key: &str, records: Vec<serde_json::Value>) -> StorageResult<()> {
        let ordinal = self.sets.fetch_add(1, Ordering::SeqCst) + 1;
        let target = self.fail_on_set.load(Ordering::SeqCst);
        if target != 0 && ordinal == target {
            self.fail_on_set.store(0, Ordering::SeqCst);
            return Err(StorageError::Unavailable(
                "injected write failure".to_string(),
            ));
        }
        self.collections.write().insert(key.to_string(), records);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_redb_unset_key_is_empty() {
        let store = RedbKeyValueStore::open_in_memory().unwrap();
        assert!(store.get(TAGS_KEY).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_redb_set_get_roundtrip() {
        let store = RedbKeyValueStore::open_in_memory().unwrap();
        let records = vec![json!({"id": "t1", "name": "proj"})];

        store.set(TAGS_KEY, records.clone()).await.unwrap();
        assert_eq!(store.get(TAGS_KEY).await.unwrap(), records);

        // Keys are independent
        assert!(store.get(RELATIONS_KEY).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_redb_set_replaces_whole_collection() {
        let store = RedbKeyValueStore::open_in_memory().unwrap();
        store
            .set(TAGS_KEY, vec![json!({"id": "t1"}), json!({"id": "t2"})])
            .await
            .unwrap();
        store.set(TAGS_KEY, vec![json!({"id": "t3"})]).await.unwrap();

        let records = store.get(TAGS_KEY).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["id"], "t3");
    }

    #[tokio::test]
    async fn test_redb_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("marque.redb");

        {
            let store = RedbKeyValueStore::open(&path).unwrap();
            store.set(TAGS_KEY, vec![json!({"id": "t1"})]).await.unwrap();
        }

        let store = RedbKeyValueStore::open(&path).unwrap();
        let records = store.get(TAGS_KEY).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["id"], "t1");
    }

    #[tokio::test]
    async fn test_memory_read_counting() {
        let store = MemoryKeyValueStore::new();
        store.get(TAGS_KEY).await.unwrap();
        store.get(TAGS_KEY).await.unwrap();
        assert_eq!(store.read_count(), 2);
    }

    #[tokio::test]
    async fn test_memory_read_failure_toggle() {
        let store = MemoryKeyValueStore::new();
        store.set_read_failure(true);
        assert!(matches!(
            store.get(TAGS_KEY).await,
            Err(StorageError::Unavailable(_))
        ));

        store.set_read_failure(false);
        assert!(store.get(TAGS_KEY).await.is_ok());
        // Failed reads never reached the store
        assert_eq!(store.read_count(), 1);
    }

    #[tokio::test]
    async fn test_memory_one_shot_set_failure() {
        let store = MemoryKeyValueStore::new();
        store.fail_once_on_set(2);

        store.set(TAGS_KEY, vec![json!({"id": "t1"})]).await.unwrap();
        assert!(store.set(TAGS_KEY, vec![json!({"id": "t2"})]).await.is_err());
        // Recovered: the failure is one-shot
        store.set(TAGS_KEY, vec![json!({"id": "t3"})]).await.unwrap();

        let records = store.get(TAGS_KEY).await.unwrap();
        assert_eq!(records[0]["id"], "t3");
    }
}
