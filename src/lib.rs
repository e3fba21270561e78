//! Stable integer ids for file and directory paths.
//!
//! A [`FilePathCache`] splits a path into directory and leaf name, interns
//! both in memory and persists them through a [`PathStore`]. The default
//! store is [`RedbPathStore`], an embedded redb database.
//!
//! ```no_run
//! use pathcache::{FilePathCache, RedbPathStore};
//!
//! let cache = FilePathCache::new(RedbPathStore::in_memory()?)?;
//! let id = cache.file_path_id("/src/main.rs")?;
//! assert_eq!(cache.file_path(id)?, "/src/main.rs");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod caching;
pub mod codec;
pub mod db;
pub mod dbpath;
pub mod error;
pub mod file_path;
pub mod file_path_cache;
pub mod ids;
pub mod interner;
pub mod retry;
pub mod schema;
pub mod store;

pub use caching::{FilePathCaching, OwnedFilePathCaching, SharedFilePathCaching};
pub use db::RedbPathStore;
pub use error::{CodecError, PathCacheError, StoreError};
pub use file_path_cache::FilePathCache;
pub use ids::{DirectoryPathId, FilePathId};
pub use store::PathStore;
