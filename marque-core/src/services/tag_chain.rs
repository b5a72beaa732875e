//! Tag chain materialization
//!
//! Turns a typed path plus a bookmark id into a validated chain of tag
//! records and one relation:
//!
//! ```text
//! materialize("proj/redesign/refs", item)
//!     ├─ 1. Parse and normalize the path (no mutation yet)
//!     ├─ 2. Snapshot all tags once
//!     ├─ 3. Per depth: reuse the matching sibling or create the segment,
//!     │      recording created ids for rollback
//!     ├─ 4. Link the deepest tag to the bookmark
//!     └─ 5. On error: best-effort delete of created tags, then re-raise
//! ```
//!
//! Existing tags along the path are reused, never duplicated; only the
//! missing suffix is created. A failure after creating N ancestors leaves
//! zero new tags behind, except where rollback itself partially fails
//! (logged, never re-raised — the original error still surfaces).
//!
//! Within one run steps execute strictly in path order: each "already
//! exists" check depends on the creations before it. Concurrent runs over an
//! overlapping prefix are not fenced; the store is last-writer-wins and a
//! duplicated sibling from such a race is accepted as a known limitation.

use crate::db::models::{Tag, TagCreate};
use crate::db::repository::{RelationRepository, RepoError, TagRepository};
use crate::path::{PathError, TagPath};
use std::sync::Arc;
use thiserror::Error;

/// Chain materialization errors
#[derive(Debug, Error)]
pub enum ChainError {
    #[error(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    Repo(#[from] RepoError),
}

pub type ChainResult<T> = Result<T, ChainError>;

/// Outcome of one materialization
#[derive(Debug, Clone)]
pub struct ChainOutcome {
    /// Deepest tag of the chain, the one linked to the bookmark
    pub leaf: Tag,
    /// Ids of tags created by this run, root-most first
    pub created: Vec<String>,
}

#[derive(Clone)]
pub struct TagChainService {
    tags: Arc<TagRepository>,
    relations: Arc<RelationRepository>,
}

impl TagChainService {
    pub fn new(tags: Arc<TagRepository>, relations: Arc<RelationRepository>) -> Self {
        Self { tags, relations }
    }

    /// Ensure every segment of `path` exists as a tag and link the deepest
    /// one to `item_id`
    pub async fn materialize(&self, path: &str, item_id: &str) -> ChainResult<ChainOutcome> {
        let path = TagPath::parse(path)?;
        tracing::debug!(path = %path.normalized(), item_id, "materializing tag chain");

        // One snapshot for the whole run; created tags are appended to the
        // working copy so later sibling lookups see them.
        let mut snapshot = self.tags.list().await?;
        let mut created: Vec<String> = Vec::new();
        let mut current: Option<Tag> = None;

        for (depth, segment) in path.segments().iter().enumerate() {
            let parent_id = current.as_ref().map(|t| t.id.clone());
            path.require_parent(depth, parent_id.as_deref())?;

            let existing = snapshot
                .iter()
                .find(|t| t.name == *segment && t.parent_id == parent_id)
                .cloned();

            let tag = match existing {
                Some(tag) => tag,
                None => match self
                    .tags
                    .create(TagCreate {
                        name: segment.clone(),
                        parent_id: parent_id.clone(),
                        order: None,
                        color: None,
                    })
                    .await
                {
                    Ok(tag) => {
                        tracing::debug!(depth, tag_id = %tag.id, name = %tag.name, "created chain segment");
                        created.push(tag.id.clone());
                        snapshot.push(tag.clone());
                        tag
                    }
                    Err(err) => {
                        self.rollback(&created).await;
                        return Err(err.into());
                    }
                },
            };
            current = Some(tag);
        }

        let Some(leaf) = current else {
            // Parse guarantees at least one segment
            return Err(PathError::EmptyPath.into());
        };

        if let Err(err) = self.relations.create(&leaf.id, item_id).await {
            self.rollback(&created).await;
            return Err(err.into());
        }

        tracing::info!(
            path = %path.normalized(),
            leaf_id = %leaf.id,
            created = created.len(),
            item_id,
            "tag chain materialized"
        );
        Ok(ChainOutcome { leaf, created })
    }

    /// Best-effort compensation: delete created tags, newest first
    ///
    /// Deleting in reverse creation order removes children before parents,
    /// so the non-cascade re-parenting branch never fires on a clean
    /// rollback. Failures are logged and never override the original error.
    async fn rollback(&self, created: &[String]) {
        if created.is_empty() {
            return;
        }
        tracing::warn!(count = created.len(), "rolling back partially created tag chain");
        for tag_id in created.iter().rev() {
            if let Err(err) = self.tags.delete(tag_id, false).await {
                tracing::warn!(tag_id = %tag_id, error = %err, "rollback delete failed");
            }
        }
    }
}
