//! Tagging flows spanning both repositories
//!
//! The relation collection is a bare join table, so deleting a tag must
//! explicitly clean up the relations that reference it — nothing does that
//! implicitly. This service owns that contract plus the convenience flows
//! built on top of the repositories.

use super::tag_chain::{ChainOutcome, ChainResult, TagChainService};
use crate::db::repository::{RelationRepository, RepoError, RepoResult, TagRepository};
use crate::path::full_path;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone)]
pub struct TaggingService {
    tags: Arc<TagRepository>,
    relations: Arc<RelationRepository>,
    chains: TagChainService,
}

impl TaggingService {
    pub fn new(tags: Arc<TagRepository>, relations: Arc<RelationRepository>) -> Self {
        let chains = TagChainService::new(tags.clone(), relations.clone());
        Self {
            tags,
            relations,
            chains,
        }
    }

    pub fn chains(&self) -> &TagChainService {
        &self.chains
    }

    /// Apply one tag path to a bookmark, creating missing segments
    pub async fn tag_bookmark(&self, path: &str, item_id: &str) -> ChainResult<ChainOutcome> {
        self.chains.materialize(path, item_id).await
    }

    /// Apply several paths to one bookmark
    ///
    /// Paths are materialized in order; one failing path does not stop the
    /// rest, every outcome is reported per path.
    pub async fn tag_bookmark_many(
        &self,
        paths: &[String],
        item_id: &str,
    ) -> Vec<(String, ChainResult<ChainOutcome>)> {
        let mut results = Vec::with_capacity(paths.len());
        for path in paths {
            let result = self.chains.materialize(path, item_id).await;
            if let Err(err) = &result {
                tracing::warn!(path = %path, error = %err, "batch tagging entry failed");
            }
            results.push((path.clone(), result));
        }
        results
    }

    /// Remove one tag from one bookmark (idempotent)
    pub async fn untag(&self, tag_id: &str, item_id: &str) -> RepoResult<()> {
        self.relations.delete(tag_id, item_id).await
    }

    /// Delete a tag and the relations referencing every removed id
    ///
    /// Non-cascade keeps the children (re-parented by the repository) and
    /// their relations untouched; only the deleted tag's own relations go.
    /// Returns the removed tag ids.
    pub async fn delete_tag(&self, id: &str, cascade: bool) -> RepoResult<Vec<String>> {
        let removed = self.tags.delete(id, cascade).await?;
        for tag_id in &removed {
            self.relations.delete_all_for_tag(tag_id).await?;
        }
        tracing::info!(tag_id = %id, cascade, removed = removed.len(), "tag deleted with relations");
        Ok(removed)
    }

    /// Cleanup hook for bookmark deletion flows
    pub async fn remove_bookmark_relations(&self, item_id: &str) -> RepoResult<usize> {
        self.relations.delete_all_for_item(item_id).await
    }

    /// Relation count per tag id, over one relation snapshot
    pub async fn tag_counts(&self) -> RepoResult<HashMap<String, usize>> {
        let mut counts = HashMap::new();
        for relation in self.relations.list().await? {
            *counts.entry(relation.tag_id).or_insert(0) += 1;
        }
        Ok(counts)
    }

    /// Canonical `/`-joined path of a tag
    pub async fn tag_full_path(&self, id: &str) -> ChainResult<String> {
        let snapshot = self.tags.list().await?;
        let tag = snapshot
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| RepoError::NotFound(format!("Tag {} not found", id)))?;
        Ok(full_path(tag, &snapshot)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bookmarks::MemoryBookmarkStore;
    use crate::db::storage::MemoryKeyValueStore;

    struct Fixture {
        tags: Arc<TagRepository>,
        relations: Arc<RelationRepository>,
        tagging: TaggingService,
    }

    fn test_fixture() -> Fixture {
        let store = Arc::new(MemoryKeyValueStore::new());
        let tags = Arc::new(TagRepository::new(store.clone()));
        let relations = Arc::new(RelationRepository::new(
            store,
            tags.clone(),
            Arc::new(MemoryBookmarkStore::new()),
        ));
        let tagging = TaggingService::new(tags.clone(), relations.clone());
        Fixture {
            tags,
            relations,
            tagging,
        }
    }

    #[tokio::test]
    async fn test_delete_tag_cascade_cleans_subtree_relations() {
        let fx = test_fixture();
        let a = fx.tagging.tag_bookmark("a", "b1").await.unwrap().leaf;
        let c = fx.tagging.tag_bookmark("a/b/c", "b2").await.unwrap().leaf;
        fx.tagging.tag_bookmark("other", "b3").await.unwrap();

        let removed = fx.tagging.delete_tag(&a.id, true).await.unwrap();
        assert_eq!(removed.len(), 3);
        assert!(removed.contains(&c.id));

        let tags = fx.tags.list().await.unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].name, "other");

        // Only the unrelated relation survives
        let relations = fx.relations.list().await.unwrap();
        assert_eq!(relations.len(), 1);
        assert_eq!(relations[0].item_id, "b3");
    }

    #[tokio::test]
    async fn test_delete_tag_non_cascade_keeps_child_relations() {
        let fx = test_fixture();
        let mid = fx.tagging.tag_bookmark("root/mid", "b1").await.unwrap().leaf;
        let leaf = fx
            .tagging
            .tag_bookmark("root/mid/leaf", "b2")
            .await
            .unwrap()
            .leaf;

        fx.tagging.delete_tag(&mid.id, false).await.unwrap();

        // mid's relation is gone, leaf's survives
        let relations = fx.relations.list().await.unwrap();
        assert_eq!(relations.len(), 1);
        assert!(relations[0].matches(&leaf.id, "b2"));

        // leaf hopped up to root
        let tags = fx.tags.list().await.unwrap();
        let leaf_now = tags.iter().find(|t| t.id == leaf.id).unwrap();
        let root = tags.iter().find(|t| t.name == "root").unwrap();
        assert_eq!(leaf_now.parent_id.as_deref(), Some(root.id.as_str()));
    }

    #[tokio::test]
    async fn test_untag_only_touches_one_pair() {
        let fx = test_fixture();
        let tag = fx.tagging.tag_bookmark("a", "b1").await.unwrap().leaf;
        fx.tagging.tag_bookmark("a", "b2").await.unwrap();

        fx.tagging.untag(&tag.id, "b1").await.unwrap();
        // Absent pair: still fine
        fx.tagging.untag(&tag.id, "b1").await.unwrap();

        let relations = fx.relations.list().await.unwrap();
        assert_eq!(relations.len(), 1);
        assert_eq!(relations[0].item_id, "b2");
    }

    #[tokio::test]
    async fn test_tag_bookmark_many_continues_past_failures() {
        let fx = test_fixture();
        let paths = vec![
            "proj/refs".to_string(),
            " / ".to_string(),
            "proj/ideas".to_string(),
        ];

        let results = fx.tagging.tag_bookmark_many(&paths, "b1").await;
        assert_eq!(results.len(), 3);
        assert!(results[0].1.is_ok());
        assert!(results[1].1.is_err());
        assert!(results[2].1.is_ok());

        // proj is shared, refs and ideas hang off it
        assert_eq!(fx.tags.list().await.unwrap().len(), 3);
        assert_eq!(fx.relations.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_remove_bookmark_relations() {
        let fx = test_fixture();
        fx.tagging.tag_bookmark("a", "b1").await.unwrap();
        fx.tagging.tag_bookmark("b", "b1").await.unwrap();
        fx.tagging.tag_bookmark("a", "b2").await.unwrap();

        assert_eq!(fx.tagging.remove_bookmark_relations("b1").await.unwrap(), 2);
        let relations = fx.relations.list().await.unwrap();
        assert_eq!(relations.len(), 1);
        assert_eq!(relations[0].item_id, "b2");
    }

    #[tokio::test]
    async fn test_tag_counts() {
        let fx = test_fixture();
        let a = fx.tagging.tag_bookmark("a", "b1").await.unwrap().leaf;
        fx.tagging.tag_bookmark("a", "b2").await.unwrap();
        let b = fx.tagging.tag_bookmark("b", "b1").await.unwrap().leaf;

        let counts = fx.tagging.tag_counts().await.unwrap();
        assert_eq!(counts.get(&a.id), Some(&2));
        assert_eq!(counts.get(&b.id), Some(&1));
    }

    #[tokio::test]
    async fn test_tag_full_path() {
        let fx = test_fixture();
        let leaf = fx
            .tagging
            .tag_bookmark("proj/web/design", "b1")
            .await
            .unwrap()
            .leaf;

        let path = fx.tagging.tag_full_path(&leaf.id).await.unwrap();
        assert_eq!(path, "proj/web/design");

        let err = fx.tagging.tag_full_path("ghost").await.unwrap_err();
        assert!(matches!(
            err,
            crate::services::ChainError::Repo(RepoError::NotFound(_))
        ));
    }
}
