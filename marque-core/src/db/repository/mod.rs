//! Repository Module
//!
//! Cached CRUD over the two persisted collections. Each repository owns one
//! whole-collection read cache with a fixed freshness window:
//!
//! - a `list()` within the window is served from memory without touching the
//!   store, as a defensive copy;
//! - a store failure on refresh degrades to the last good copy when one
//!   exists (stale-on-error), and only propagates when there is none;
//! - every write persists the whole collection and invalidates the cache
//!   before returning, so the next read re-fetches.
//!
//! Repositories are plain instances wired by the embedder; there is no
//! global registry.

pub mod relation;
pub mod tag;

// Re-exports
pub use relation::RelationRepository;
pub use tag::TagRepository;

use crate::db::storage::StorageError;
use parking_lot::RwLock;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

/// Freshness window for repository read caches
pub(crate) const CACHE_TTL: Duration = Duration::from_secs(5);

/// Repository error types
///
/// Logical misses (`NotFound`, `DuplicateName`, `Validation`) are kept
/// distinct from I/O failures (`Storage`) so callers can decide what is
/// worth retrying.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate name: {0}")]
    DuplicateName(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage unavailable: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

/// Whole-collection read cache with a fixed freshness window
pub(crate) struct CollectionCache<T> {
    entry: RwLock<Option<(Vec<T>, Instant)>>,
}

impl<T: Clone> CollectionCache<T> {
    pub(crate) fn new() -> Self {
        Self {
            entry: RwLock::new(None),
        }
    }

    /// Cached copy if within the freshness window
    pub(crate) fn fresh(&self) -> Option<Vec<T>> {
        let guard = self.entry.read();
        match guard.as_ref() {
            Some((records, fetched_at)) if fetched_at.elapsed() < CACHE_TTL => {
                Some(records.clone())
            }
            _ => None,
        }
    }

    /// Cached copy regardless of age (stale-on-error fallback)
    pub(crate) fn any(&self) -> Option<Vec<T>> {
        self.entry.read().as_ref().map(|(records, _)| records.clone())
    }

    pub(crate) fn store(&self, records: Vec<T>) {
        *self.entry.write() = Some((records, Instant::now()));
    }

    pub(crate) fn invalidate(&self) {
        *self.entry.write() = None;
    }
}
