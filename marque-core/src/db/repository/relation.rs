//! Relation Repository
//!
//! CRUD over the `tag_item_relations` collection, with the same read-cache
//! discipline as the tag repository. Reverse lookups filter the relation
//! collection down to an id list before resolving through the tag repository
//! or the bookmark store, so references that no longer resolve cost nothing
//! and are skipped rather than surfaced as errors.

use super::{CollectionCache, RepoResult, TagRepository};
use crate::bookmarks::{BookmarkRecord, BookmarkStore};
use crate::db::models::{Tag, TagRelation};
use crate::db::storage::{KeyValueStore, RELATIONS_KEY, StorageError};
use crate::utils::now_millis;
use std::sync::Arc;

#[derive(Clone)]
pub struct RelationRepository {
    store: Arc<dyn KeyValueStore>,
    tags: Arc<TagRepository>,
    bookmarks: Arc<dyn BookmarkStore>,
    cache: Arc<CollectionCache<TagRelation>>,
}

impl RelationRepository {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        tags: Arc<TagRepository>,
        bookmarks: Arc<dyn BookmarkStore>,
    ) -> Self {
        Self {
            store,
            tags,
            bookmarks,
            cache: Arc::new(CollectionCache::new()),
        }
    }

    /// Fetch all relations, serving from the read cache within its window
    ///
    /// Same contract as [`TagRepository::list`]: defensive copy, stale cache
    /// on store failure when one exists.
    pub async fn list(&self) -> RepoResult<Vec<TagRelation>> {
        if let Some(relations) = self.cache.fresh() {
            return Ok(relations);
        }

        match self.fetch().await {
            Ok(relations) => {
                self.cache.store(relations.clone());
                Ok(relations)
            }
            Err(err) => {
                if let Some(relations) = self.cache.any() {
                    tracing::warn!(error = %err, "relation fetch failed, serving stale cache");
                    Ok(relations)
                } else {
                    Err(err.into())
                }
            }
        }
    }

    /// Link a tag to a bookmark
    ///
    /// Idempotent: an existing pair is returned unchanged, with no timestamp
    /// bump and no store write.
    pub async fn create(&self, tag_id: &str, item_id: &str) -> RepoResult<TagRelation> {
        let mut relations = self.list().await?;
        if let Some(existing) = relations.iter().find(|r| r.matches(tag_id, item_id)) {
            return Ok(existing.clone());
        }

        let relation = TagRelation {
            tag_id: tag_id.to_string(),
            item_id: item_id.to_string(),
            created_at: now_millis(),
        };
        relations.push(relation.clone());
        self.persist(&relations).await?;
        tracing::debug!(tag_id, item_id, "relation created");
        Ok(relation)
    }

    /// Unlink a tag from a bookmark; removing an absent pair is a no-op
    pub async fn delete(&self, tag_id: &str, item_id: &str) -> RepoResult<()> {
        let mut relations = self.list().await?;
        let before = relations.len();
        relations.retain(|r| !r.matches(tag_id, item_id));
        if relations.len() != before {
            self.persist(&relations).await?;
            tracing::debug!(tag_id, item_id, "relation deleted");
        }
        Ok(())
    }

    /// Remove every relation referencing `tag_id`, returning how many went
    pub async fn delete_all_for_tag(&self, tag_id: &str) -> RepoResult<usize> {
        let mut relations = self.list().await?;
        let before = relations.len();
        relations.retain(|r| r.tag_id != tag_id);
        let removed = before - relations.len();
        if removed > 0 {
            self.persist(&relations).await?;
            tracing::debug!(tag_id, removed, "relations removed for tag");
        }
        Ok(removed)
    }

    /// Remove every relation referencing `item_id`, returning how many went
    pub async fn delete_all_for_item(&self, item_id: &str) -> RepoResult<usize> {
        let mut relations = self.list().await?;
        let before = relations.len();
        relations.retain(|r| r.item_id != item_id);
        let removed = before - relations.len();
        if removed > 0 {
            self.persist(&relations).await?;
            tracing::debug!(item_id, removed, "relations removed for bookmark");
        }
        Ok(removed)
    }

    /// Tags attached to a bookmark
    ///
    /// Relations whose tag no longer resolves are skipped (logged, not an
    /// error); they stay in the collection until something deletes them.
    pub async fn tags_for_item(&self, item_id: &str) -> RepoResult<Vec<Tag>> {
        let tag_ids: Vec<String> = self
            .list()
            .await?
            .into_iter()
            .filter(|r| r.item_id == item_id)
            .map(|r| r.tag_id)
            .collect();
        if tag_ids.is_empty() {
            return Ok(Vec::new());
        }

        let snapshot = self.tags.list().await?;
        let mut tags = Vec::with_capacity(tag_ids.len());
        for tag_id in tag_ids {
            match snapshot.iter().find(|t| t.id == tag_id) {
                Some(tag) => tags.push(tag.clone()),
                None => tracing::debug!(tag_id = %tag_id, "skipping relation to missing tag"),
            }
        }
        Ok(tags)
    }

    /// Bookmarks attached to a tag
    ///
    /// Ids that no longer resolve in the bookmark store are skipped.
    pub async fn items_for_tag(&self, tag_id: &str) -> RepoResult<Vec<BookmarkRecord>> {
        let item_ids: Vec<String> = self
            .list()
            .await?
            .into_iter()
            .filter(|r| r.tag_id == tag_id)
            .map(|r| r.item_id)
            .collect();

        let mut items = Vec::with_capacity(item_ids.len());
        for item_id in item_ids {
            match self.bookmarks.get(&item_id).await? {
                Some(record) => items.push(record),
                None => tracing::debug!(item_id = %item_id, "skipping relation to missing bookmark"),
            }
        }
        Ok(items)
    }

    /// Relation count for one tag, without resolving anything
    pub async fn count_for_tag(&self, tag_id: &str) -> RepoResult<usize> {
        Ok(self
            .list()
            .await?
            .iter()
            .filter(|r| r.tag_id == tag_id)
            .count())
    }

    /// Drop the cache and re-read once (import boundary hook)
    pub async fn refresh(&self) -> RepoResult<Vec<TagRelation>> {
        self.cache.invalidate();
        self.list().await
    }

    async fn fetch(&self) -> Result<Vec<TagRelation>, StorageError> {
        let raw = self.store.get(RELATIONS_KEY).await?;
        let mut relations = Vec::with_capacity(raw.len());
        for value in raw {
            match serde_json::from_value::<TagRelation>(value) {
                Ok(relation) => relations.push(relation),
                Err(err) => tracing::warn!(error = %err, "skipping malformed relation record"),
            }
        }
        Ok(relations)
    }

    async fn persist(&self, relations: &[TagRelation]) -> RepoResult<()> {
        let raw = relations
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()
            .map_err(StorageError::from)?;
        self.store.set(RELATIONS_KEY, raw).await?;
        // The write must be visible to the next read
        self.cache.invalidate();
        Ok(())
    }
}
