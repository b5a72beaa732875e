//! Database layer
//!
//! The persistent side of the engine is an external key/value store holding
//! two JSON collections (`tags`, `tag_item_relations`). `storage` defines
//! the store seam and the bundled backends, `models` the persisted records,
//! `repository` the cached CRUD layers on top.

pub mod models;
pub mod repository;
pub mod storage;
