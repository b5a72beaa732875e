//! Marque Core - bookmark tag hierarchy and relation engine
//!
//! # Overview
//!
//! This crate is the tagging core of Marque: it turns user-typed paths like
//! `research/ai/nlp` into chains of tag records linked to externally-owned
//! bookmarks, and answers lookups in both directions.
//!
//! - **Path parsing** (`path`): segments, depth, normalization, full-path
//!   reconstruction with cycle detection
//! - **Database** (`db`): key/value store seam, persisted models, cached
//!   repositories
//! - **Services** (`services`): tag chain materialization with rollback,
//!   cross-repository tagging flows, library import/export
//! - **Bookmarks** (`bookmarks`): interface to the external bookmark store
//!
//! # Module structure
//!
//! ```text
//! marque-core/src/
//! ├── path.rs        # TagPath parser + full-path reconstruction
//! ├── bookmarks.rs   # BookmarkStore trait (external collaborator)
//! ├── db/            # storage seam, models, repositories
//! ├── services/      # chain materializer, tagging flows, import/export
//! └── utils/         # time and color helpers
//! ```
//!
//! # Wiring
//!
//! There are no globals: the embedder constructs one store, the two
//! repositories and the services once at startup and passes them by handle.
//!
//! ```ignore
//! let store = Arc::new(RedbKeyValueStore::open(data_dir.join("marque.redb"))?);
//! let tags = Arc::new(TagRepository::new(store.clone()));
//! let relations = Arc::new(RelationRepository::new(store.clone(), tags.clone(), bookmarks));
//! let tagging = TaggingService::new(tags, relations);
//! tagging.tag_bookmark("proj/redesign/refs", &bookmark_id).await?;
//! ```

pub mod bookmarks;
pub mod db;
pub mod path;
pub mod services;
pub mod utils;

// Re-export 公共类型
pub use bookmarks::{BookmarkRecord, BookmarkStore, MemoryBookmarkStore};
pub use db::models::{Tag, TagCreate, TagRelation, TagUpdate};
pub use db::repository::{RelationRepository, RepoError, RepoResult, TagRepository};
pub use db::storage::{
    KeyValueStore, MemoryKeyValueStore, RedbKeyValueStore, StorageError, StorageResult,
};
pub use path::{PathError, PathResult, TagPath, full_path};
pub use services::{
    ChainError, ChainOutcome, ChainResult, ImportError, ImportExportService, LibraryExport,
    TagChainService, TaggingService,
};
