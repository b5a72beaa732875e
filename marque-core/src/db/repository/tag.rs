//! Tag Repository
//!
//! CRUD over the `tags` collection. Hierarchy lives in the records'
//! `parent_id` links; this layer enforces sibling name uniqueness
//! (case-insensitive) and keeps the parent graph acyclic on re-parenting,
//! but leaves path semantics to the parser and the chain materializer.

use super::{CollectionCache, RepoError, RepoResult};
use crate::db::models::{Tag, TagCreate, TagUpdate};
use crate::db::storage::{KeyValueStore, StorageError, TAGS_KEY};
use crate::utils::{now_millis, random_pastel};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct TagRepository {
    store: Arc<dyn KeyValueStore>,
    cache: Arc<CollectionCache<Tag>>,
}

impl TagRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            cache: Arc::new(CollectionCache::new()),
        }
    }

    /// Fetch all tags, serving from the read cache within its window
    ///
    /// A store failure degrades to the last cached copy when one exists,
    /// even past the window; without any cache the error propagates. The
    /// returned vector is the caller's own copy.
    pub async fn list(&self) -> RepoResult<Vec<Tag>> {
        if let Some(tags) = self.cache.fresh() {
            return Ok(tags);
        }

        match self.fetch().await {
            Ok(tags) => {
                self.cache.store(tags.clone());
                Ok(tags)
            }
            Err(err) => {
                if let Some(tags) = self.cache.any() {
                    tracing::warn!(error = %err, "tag fetch failed, serving stale cache");
                    Ok(tags)
                } else {
                    Err(err.into())
                }
            }
        }
    }

    /// Find tag by id
    pub async fn get_by_id(&self, id: &str) -> RepoResult<Option<Tag>> {
        Ok(self.list().await?.into_iter().find(|t| t.id == id))
    }

    /// Root-level tags ordered by `order`
    pub async fn roots(&self) -> RepoResult<Vec<Tag>> {
        let mut tags: Vec<Tag> = self
            .list()
            .await?
            .into_iter()
            .filter(|t| t.parent_id.is_none())
            .collect();
        tags.sort_by_key(|t| t.order);
        Ok(tags)
    }

    /// Direct children of `parent_id` ordered by `order`
    pub async fn children_of(&self, parent_id: &str) -> RepoResult<Vec<Tag>> {
        let mut tags: Vec<Tag> = self
            .list()
            .await?
            .into_iter()
            .filter(|t| t.parent_id.as_deref() == Some(parent_id))
            .collect();
        tags.sort_by_key(|t| t.order);
        Ok(tags)
    }

    /// Create a new tag
    ///
    /// `order` defaults to the current sibling count, `color` to a generated
    /// pastel value.
    pub async fn create(&self, data: TagCreate) -> RepoResult<Tag> {
        let name = valid_name(&data.name)?;
        let mut tags = self.list().await?;

        if let Some(parent_id) = data.parent_id.as_deref()
            && !tags.iter().any(|t| t.id == parent_id)
        {
            return Err(RepoError::NotFound(format!(
                "Parent tag {} not found",
                parent_id
            )));
        }
        if sibling_name_taken(&tags, &name, data.parent_id.as_deref(), None) {
            return Err(RepoError::DuplicateName(format!(
                "Tag '{}' already exists under the same parent",
                name
            )));
        }

        let sibling_count = tags
            .iter()
            .filter(|t| t.parent_id == data.parent_id)
            .count();
        let now = now_millis();
        let tag = Tag {
            id: Uuid::new_v4().to_string(),
            name,
            parent_id: data.parent_id,
            order: data.order.unwrap_or(sibling_count as i32),
            color: data.color.unwrap_or_else(random_pastel),
            created_at: now,
            updated_at: now,
        };

        tags.push(tag.clone());
        self.persist(&tags).await?;
        tracing::debug!(tag_id = %tag.id, name = %tag.name, "tag created");
        Ok(tag)
    }

    /// Update a tag
    ///
    /// Merges only the supplied fields; an omitted field keeps its stored
    /// value (`color` included, it is never cleared implicitly). Re-parenting
    /// validates that the new parent exists and is not inside the tag's own
    /// subtree.
    pub async fn update(&self, id: &str, data: TagUpdate) -> RepoResult<Tag> {
        let mut tags = self.list().await?;
        let idx = tags
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| RepoError::NotFound(format!("Tag {} not found", id)))?;

        let mut updated = tags[idx].clone();
        if let Some(name) = data.name {
            updated.name = valid_name(&name)?;
        }
        if let Some(parent_id) = data.parent_id {
            if let Some(new_parent) = parent_id.as_deref() {
                if !tags.iter().any(|t| t.id == new_parent) {
                    return Err(RepoError::NotFound(format!(
                        "Parent tag {} not found",
                        new_parent
                    )));
                }
                if would_create_cycle(&tags, id, new_parent) {
                    return Err(RepoError::Validation(format!(
                        "Cannot move tag {} under its own descendant",
                        id
                    )));
                }
            }
            updated.parent_id = parent_id;
        }
        if let Some(order) = data.order {
            updated.order = order;
        }
        if let Some(color) = data.color {
            updated.color = color;
        }

        if sibling_name_taken(&tags, &updated.name, updated.parent_id.as_deref(), Some(id)) {
            return Err(RepoError::DuplicateName(format!(
                "Tag '{}' already exists under the same parent",
                updated.name
            )));
        }

        updated.updated_at = now_millis();
        tags[idx] = updated.clone();
        self.persist(&tags).await?;
        tracing::debug!(tag_id = %id, "tag updated");
        Ok(updated)
    }

    /// Delete a tag, returning the removed ids
    ///
    /// `cascade = false` re-parents direct children to the deleted tag's
    /// former parent (root when none) and removes only this record.
    /// `cascade = true` removes the whole subtree in one persist. Cleaning up
    /// relations that reference the removed ids is the caller's contract.
    pub async fn delete(&self, id: &str, cascade: bool) -> RepoResult<Vec<String>> {
        let mut tags = self.list().await?;
        let target = tags
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or_else(|| RepoError::NotFound(format!("Tag {} not found", id)))?;

        let removed = if cascade {
            collect_subtree(&tags, id)
        } else {
            let now = now_millis();
            for child in tags
                .iter_mut()
                .filter(|t| t.parent_id.as_deref() == Some(id))
            {
                child.parent_id = target.parent_id.clone();
                child.updated_at = now;
            }
            vec![id.to_string()]
        };

        let removed_set: HashSet<&str> = removed.iter().map(String::as_str).collect();
        tags.retain(|t| !removed_set.contains(t.id.as_str()));
        self.persist(&tags).await?;
        tracing::debug!(tag_id = %id, cascade, removed = removed.len(), "tag deleted");
        Ok(removed)
    }

    /// Drop the cache and re-read once (import boundary hook)
    pub async fn refresh(&self) -> RepoResult<Vec<Tag>> {
        self.cache.invalidate();
        self.list().await
    }

    async fn fetch(&self) -> Result<Vec<Tag>, StorageError> {
        let raw = self.store.get(TAGS_KEY).await?;
        let mut tags = Vec::with_capacity(raw.len());
        for value in raw {
            match serde_json::from_value::<Tag>(value) {
                Ok(tag) => tags.push(tag),
                Err(err) => tracing::warn!(error = %err, "skipping malformed tag record"),
            }
        }
        Ok(tags)
    }

    async fn persist(&self, tags: &[Tag]) -> RepoResult<()> {
        let raw = tags
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()
            .map_err(StorageError::from)?;
        self.store.set(TAGS_KEY, raw).await?;
        // The write must be visible to the next read
        self.cache.invalidate();
        Ok(())
    }
}

/// A tag name is one non-empty segment with no path separator
fn valid_name(raw: &str) -> RepoResult<String> {
    let name = raw.trim();
    if name.is_empty() || name.contains('/') {
        return Err(RepoError::Validation(format!("Invalid tag name '{raw}'")));
    }
    Ok(name.to_string())
}

/// Case-insensitive sibling uniqueness check
fn sibling_name_taken(
    tags: &[Tag],
    name: &str,
    parent_id: Option<&str>,
    exclude_id: Option<&str>,
) -> bool {
    let needle = name.to_lowercase();
    tags.iter().any(|t| {
        exclude_id != Some(t.id.as_str())
            && t.parent_id.as_deref() == parent_id
            && t.name.to_lowercase() == needle
    })
}

/// Whether putting `id` under `new_parent` closes a loop
fn would_create_cycle(tags: &[Tag], id: &str, new_parent: &str) -> bool {
    let mut visited: HashSet<&str> = HashSet::new();
    let mut current = Some(new_parent);
    while let Some(cur) = current {
        if cur == id || !visited.insert(cur) {
            return true;
        }
        current = tags
            .iter()
            .find(|t| t.id == cur)
            .and_then(|t| t.parent_id.as_deref());
    }
    false
}

/// Depth-first subtree collection over the parent→children adjacency
///
/// The visited set keeps a malformed (cyclic) graph from looping; orphans
/// whose parent id does not resolve are reachable only when the walk starts
/// at them.
fn collect_subtree(tags: &[Tag], root: &str) -> Vec<String> {
    let mut removed = Vec::new();
    let mut stack = vec![root.to_string()];
    let mut visited: HashSet<String> = HashSet::new();

    while let Some(cur) = stack.pop() {
        if !visited.insert(cur.clone()) {
            continue;
        }
        for child in tags
            .iter()
            .filter(|t| t.parent_id.as_deref() == Some(cur.as_str()))
        {
            stack.push(child.id.clone());
        }
        removed.push(cur);
    }
    removed
}
