//! Library import/export boundary
//!
//! A full export is exactly the two raw collections. Import validates record
//! shape first, overwrites the store wholesale, then forces both
//! repositories to re-read so no cached copy survives the swap. There is no
//! schema version field; unknown fields on incoming records are accepted and
//! dropped on the next re-serialization.

use crate::db::models::{Tag, TagRelation};
use crate::db::repository::{RelationRepository, RepoError, TagRepository};
use crate::db::storage::{KeyValueStore, RELATIONS_KEY, StorageError, TAGS_KEY};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// Import boundary errors
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Invalid import format: {0}")]
    InvalidFormat(String),

    #[error(transparent)]
    Repo(#[from] RepoError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Raw snapshot of the two persisted collections
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryExport {
    pub tags: Vec<Tag>,
    pub tag_item_relations: Vec<TagRelation>,
}

pub struct ImportExportService {
    store: Arc<dyn KeyValueStore>,
    tags: Arc<TagRepository>,
    relations: Arc<RelationRepository>,
}

impl ImportExportService {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        tags: Arc<TagRepository>,
        relations: Arc<RelationRepository>,
    ) -> Self {
        Self {
            store,
            tags,
            relations,
        }
    }

    /// Snapshot both collections
    pub async fn export(&self) -> Result<LibraryExport, RepoError> {
        Ok(LibraryExport {
            tags: self.tags.list().await?,
            tag_item_relations: self.relations.list().await?,
        })
    }

    /// Validate and load a previously exported library, replacing both
    /// collections wholesale
    ///
    /// Nothing is written until the whole payload has validated, so a
    /// malformed import leaves the store untouched.
    pub async fn import(&self, data: Value) -> Result<(), ImportError> {
        let Value::Object(root) = data else {
            return Err(ImportError::InvalidFormat(
                "expected a top-level object".to_string(),
            ));
        };
        let tags = require_array(&root, "tags")?;
        let relations = require_array(&root, "tag_item_relations")?;

        for (i, record) in tags.iter().enumerate() {
            for field in ["id", "name"] {
                require_string(record, field)
                    .map_err(|detail| ImportError::InvalidFormat(format!("tags[{i}]: {detail}")))?;
            }
        }
        for (i, record) in relations.iter().enumerate() {
            for field in ["tagId", "itemId"] {
                require_string(record, field).map_err(|detail| {
                    ImportError::InvalidFormat(format!("tag_item_relations[{i}]: {detail}"))
                })?;
            }
        }

        self.store.set(TAGS_KEY, tags.clone()).await?;
        self.store.set(RELATIONS_KEY, relations.clone()).await?;

        // No cached copy may survive the swap
        self.tags.refresh().await?;
        self.relations.refresh().await?;

        tracing::info!(
            tags = tags.len(),
            relations = relations.len(),
            "library imported"
        );
        Ok(())
    }
}

fn require_array<'a>(
    root: &'a serde_json::Map<String, Value>,
    key: &str,
) -> Result<&'a Vec<Value>, ImportError> {
    root.get(key)
        .and_then(Value::as_array)
        .ok_or_else(|| ImportError::InvalidFormat(format!("'{key}' must be an array")))
}

fn require_string(record: &Value, field: &str) -> Result<(), String> {
    match record.get(field) {
        Some(Value::String(s)) if !s.is_empty() => Ok(()),
        _ => Err(format!("missing string field '{field}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bookmarks::MemoryBookmarkStore;
    use crate::db::storage::MemoryKeyValueStore;
    use crate::services::TaggingService;
    use serde_json::json;

    struct Fixture {
        store: Arc<MemoryKeyValueStore>,
        tags: Arc<TagRepository>,
        relations: Arc<RelationRepository>,
        tagging: TaggingService,
        io: ImportExportService,
    }

    fn test_fixture() -> Fixture {
        let store = Arc::new(MemoryKeyValueStore::new());
        let tags = Arc::new(TagRepository::new(store.clone()));
        let relations = Arc::new(RelationRepository::new(
            store.clone(),
            tags.clone(),
            Arc::new(MemoryBookmarkStore::new()),
        ));
        let tagging = TaggingService::new(tags.clone(), relations.clone());
        let io = ImportExportService::new(store.clone(), tags.clone(), relations.clone());
        Fixture {
            store,
            tags,
            relations,
            tagging,
            io,
        }
    }

    #[tokio::test]
    async fn test_export_is_the_two_raw_collections() {
        let fx = test_fixture();
        fx.tagging.tag_bookmark("a/b", "b1").await.unwrap();

        let export = fx.io.export().await.unwrap();
        assert_eq!(export.tags.len(), 2);
        assert_eq!(export.tag_item_relations.len(), 1);
    }

    #[tokio::test]
    async fn test_export_import_roundtrip() {
        let fx = test_fixture();
        fx.tagging.tag_bookmark("proj/refs", "b1").await.unwrap();
        let export = fx.io.export().await.unwrap();

        let other = test_fixture();
        other
            .io
            .import(serde_json::to_value(&export).unwrap())
            .await
            .unwrap();

        let tags = other.tags.list().await.unwrap();
        assert_eq!(tags.len(), 2);
        let relations = other.relations.list().await.unwrap();
        assert_eq!(relations.len(), 1);

        // Hierarchy survived the trip
        let leaf = tags.iter().find(|t| t.name == "refs").unwrap();
        let root = tags.iter().find(|t| t.name == "proj").unwrap();
        assert_eq!(leaf.parent_id.as_deref(), Some(root.id.as_str()));
    }

    #[tokio::test]
    async fn test_import_overwrites_wholesale_and_refreshes_caches() {
        let fx = test_fixture();
        fx.tagging.tag_bookmark("old", "b1").await.unwrap();
        // Warm both caches
        fx.tags.list().await.unwrap();
        fx.relations.list().await.unwrap();

        fx.io
            .import(json!({
                "tags": [{"id": "t9", "name": "imported"}],
                "tag_item_relations": [{"tagId": "t9", "itemId": "b9"}]
            }))
            .await
            .unwrap();

        // The swapped collections are visible immediately, not after a TTL
        let tags = fx.tags.list().await.unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].id, "t9");
        let relations = fx.relations.list().await.unwrap();
        assert_eq!(relations.len(), 1);
        assert!(relations[0].matches("t9", "b9"));
    }

    #[tokio::test]
    async fn test_import_accepts_unknown_fields() {
        let fx = test_fixture();
        fx.io
            .import(json!({
                "tags": [{"id": "t1", "name": "a", "pinned": true, "icon": "star"}],
                "tag_item_relations": []
            }))
            .await
            .unwrap();

        let tags = fx.tags.list().await.unwrap();
        assert_eq!(tags[0].name, "a");
    }

    #[tokio::test]
    async fn test_import_rejects_malformed_payloads() {
        let fx = test_fixture();

        let bad_shapes = [
            json!([]),
            json!({"tags": {}, "tag_item_relations": []}),
            json!({"tags": []}),
            json!({"tags": [{"name": "no id"}], "tag_item_relations": []}),
            json!({"tags": [{"id": "t1", "name": 42}], "tag_item_relations": []}),
            json!({"tags": [], "tag_item_relations": [{"tagId": "t1"}]}),
        ];
        for payload in bad_shapes {
            assert!(matches!(
                fx.io.import(payload).await,
                Err(ImportError::InvalidFormat(_))
            ));
        }

        // Store untouched by any of the rejected imports
        assert_eq!(fx.store.set_count(), 0);
    }
}
