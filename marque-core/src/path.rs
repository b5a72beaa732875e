//! Tag path parsing and full-path reconstruction
//!
//! A tag path is a `/`-separated chain of segment names, optionally prefixed
//! with a single `#` (`#research/ai/nlp`). Parsing here is pure string work;
//! the hierarchy lookups happen in the chain materializer, which must honor
//! the [`TagPath::require_parent`] contract while resolving.

use crate::db::models::Tag;
use std::collections::HashSet;
use thiserror::Error;

/// Path-level errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("Empty tag path")]
    EmptyPath,

    #[error("Missing ancestor for path: {0}")]
    MissingAncestor(String),

    #[error("Cyclic tag graph at: {0}")]
    CyclicTagGraph(String),
}

/// Result type for path operations
pub type PathResult<T> = Result<T, PathError>;

/// Parsed tag path: ordered, trimmed, non-empty segments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagPath {
    segments: Vec<String>,
}

impl TagPath {
    /// Parse a raw user-typed path
    ///
    /// Strips one optional leading `#`, splits on `/`, trims each segment
    /// and drops empty ones. Fails with [`PathError::EmptyPath`] when
    /// nothing remains.
    pub fn parse(raw: &str) -> PathResult<Self> {
        let stripped = raw.strip_prefix('#').unwrap_or(raw);
        let segments: Vec<String> = stripped
            .split('/')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        if segments.is_empty() {
            return Err(PathError::EmptyPath);
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of segments
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Segment at `depth`, if within bounds
    pub fn segment(&self, depth: usize) -> Option<&str> {
        self.segments.get(depth).map(String::as_str)
    }

    /// Normalized form: trimmed segments rejoined with `/`
    pub fn normalized(&self) -> String {
        self.segments.join("/")
    }

    /// Ancestor contract for resolution: every depth past the root must
    /// already have a resolved parent id
    pub fn require_parent(&self, depth: usize, parent_id: Option<&str>) -> PathResult<()> {
        if depth > 0 && parent_id.is_none() {
            return Err(PathError::MissingAncestor(self.segments[..depth].join("/")));
        }
        Ok(())
    }
}

/// Reconstruct the `/`-joined full path of `tag` from a snapshot of all tags
///
/// Walks `parent_id` links root-ward, prepending each visited name. The walk
/// ends at a tag without a parent or whose parent does not resolve in the
/// snapshot. A repeated id fails with [`PathError::CyclicTagGraph`] instead
/// of looping.
pub fn full_path(tag: &Tag, snapshot: &[Tag]) -> PathResult<String> {
    let mut segments = vec![tag.name.clone()];
    let mut visited: HashSet<&str> = HashSet::new();
    visited.insert(tag.id.as_str());

    let mut current = tag;
    while let Some(parent_id) = current.parent_id.as_deref() {
        let Some(parent) = snapshot.iter().find(|t| t.id == parent_id) else {
            break;
        };
        if !visited.insert(parent.id.as_str()) {
            return Err(PathError::CyclicTagGraph(parent.id.clone()));
        }
        segments.push(parent.name.clone());
        current = parent;
    }

    segments.reverse();
    Ok(segments.join("/"))
}
