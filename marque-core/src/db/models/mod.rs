//! Persisted record models
//!
//! Records are stored as camelCase JSON inside the two collections and read
//! back permissively: unknown fields are ignored and everything except the
//! identity fields has a default, so collections written by older or newer
//! builds keep loading.

pub mod relation;
pub mod tag;

pub use relation::TagRelation;
pub use tag::{Tag, TagCreate, TagUpdate};
