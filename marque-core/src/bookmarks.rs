//! External bookmark store interface
//!
//! Bookmarks are owned outside this crate; the tagging engine only needs a
//! keyed view of them. `get` resolves unknown ids to `None` rather than
//! failing — the relation lookups rely on that to skip dangling references
//! instead of erroring out.

use crate::db::storage::{StorageError, StorageResult};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Minimal bookmark record as seen by the tagging engine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkRecord {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Keyed view over externally-owned bookmarks
#[async_trait]
pub trait BookmarkStore: Send + Sync {
    async fn create(&self, record: BookmarkRecord) -> StorageResult<BookmarkRecord>;

    /// Unknown ids resolve to `None`, never an error
    async fn get(&self, id: &str) -> StorageResult<Option<BookmarkRecord>>;

    async fn delete(&self, id: &str) -> StorageResult<()>;

    /// Case-insensitive substring search over title and url
    async fn search(&self, query: &str) -> StorageResult<Vec<BookmarkRecord>>;
}

/// In-memory bookmark store for tests and ephemeral embedding
#[derive(Default)]
pub struct MemoryBookmarkStore {
    records: RwLock<HashMap<String, BookmarkRecord>>,
}

impl MemoryBookmarkStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookmarkStore for MemoryBookmarkStore {
    async fn create(&self, record: BookmarkRecord) -> StorageResult<BookmarkRecord> {
        if record.id.is_empty() {
            return Err(StorageError::Unavailable(
                "bookmark id must not be empty".to_string(),
            ));
        }
        self.records
            .write()
            .insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn get(&self, id: &str) -> StorageResult<Option<BookmarkRecord>> {
        Ok(self.records.read().get(id).cloned())
    }

    async fn delete(&self, id: &str) -> StorageResult<()> {
        self.records.write().remove(id);
        Ok(())
    }

    async fn search(&self, query: &str) -> StorageResult<Vec<BookmarkRecord>> {
        let needle = query.to_lowercase();
        let records = self.records.read();
        let mut hits: Vec<BookmarkRecord> = records
            .values()
            .filter(|r| {
                r.title.to_lowercase().contains(&needle)
                    || r.url
                        .as_deref()
                        .is_some_and(|u| u.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect();
        hits.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(hits)
    }
}
