//! 服务层 - 跨仓库的标签业务流程
//!
//! # 服务列表
//!
//! - [`TagChainService`] - 路径 → 标签链物化（含回滚）
//! - [`TaggingService`] - 标签删除契约、批量打标、反向查询辅助
//! - [`ImportExportService`] - 两个集合的整体导入导出

pub mod import_export;
pub mod tag_chain;
pub mod tagging;

pub use import_export::{ImportError, ImportExportService, LibraryExport};
pub use tag_chain::{ChainError, ChainOutcome, ChainResult, TagChainService};
pub use tagging::TaggingService;
