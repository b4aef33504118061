//! # pirate-content-store
//!
//! Write-once, content-addressed cache mapping `content_hash -> (result
//! text, first job id)`, so re-feeding the same scraped text never costs a
//! second LLM call. One JSON file per hash on disk, sharded two levels
//! deep; the in-memory index is a cache rebuildable from those files, not
//! a second source of truth.

pub mod config;
pub mod error;
pub mod store;

pub use config::ContentStoreConfig;
pub use error::{ContentStoreError, ContentStoreResult};
pub use store::{ContentRecord, ContentStore, ContentStoreStats, FsContentStore};
