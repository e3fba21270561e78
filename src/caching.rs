//! Handles other subsystems hold on to.
//!
//! [`SharedFilePathCaching`] borrows one [`FilePathCache`] and is `Copy`,
//! which suits worker pools scoped to one session.
//! [`OwnedFilePathCaching`] carries a cache of its own; cloning it builds a
//! fresh cache over a clone of the store handle, so ids stay consistent
//! through the store.

use crate::error::Result;
use crate::file_path_cache::FilePathCache;
use crate::ids::{DirectoryPathId, FilePathId};
use crate::store::PathStore;

/// Path <-> id translation as seen by consumers.
pub trait FilePathCaching {
    fn file_path_id(&self, path: &str) -> Result<FilePathId>;
    fn file_path(&self, id: FilePathId) -> Result<String>;
    fn directory_path_id(&self, path: &str) -> Result<DirectoryPathId>;
    fn directory_path_id_of(&self, id: FilePathId) -> DirectoryPathId;
    fn directory_path(&self, id: DirectoryPathId) -> Result<String>;
    fn file_path_ids(&self, paths: &[&str]) -> Result<Vec<FilePathId>>;
    fn file_paths(&self, ids: &[FilePathId]) -> Result<Vec<String>>;
    fn add_file_paths(&self, paths: &[&str]) -> Result<()>;
    fn populate_if_empty(&self) -> Result<()>;
}

impl<S: PathStore> FilePathCaching for FilePathCache<S> {
    fn file_path_id(&self, path: &str) -> Result<FilePathId> {
        FilePathCache::file_path_id(self, path)
    }

    fn file_path(&self, id: FilePathId) -> Result<String> {
        FilePathCache::file_path(self, id)
    }

    fn directory_path_id(&self, path: &str) -> Result<DirectoryPathId> {
        FilePathCache::directory_path_id(self, path)
    }

    fn directory_path_id_of(&self, id: FilePathId) -> DirectoryPathId {
        FilePathCache::directory_path_id_of(self, id)
    }

    fn directory_path(&self, id: DirectoryPathId) -> Result<String> {
        FilePathCache::directory_path(self, id)
    }

    fn file_path_ids(&self, paths: &[&str]) -> Result<Vec<FilePathId>> {
        FilePathCache::file_path_ids(self, paths)
    }

    fn file_paths(&self, ids: &[FilePathId]) -> Result<Vec<String>> {
        FilePathCache::file_paths(self, ids)
    }

    fn add_file_paths(&self, paths: &[&str]) -> Result<()> {
        FilePathCache::add_file_paths(self, paths)
    }

    fn populate_if_empty(&self) -> Result<()> {
        FilePathCache::populate_if_empty(self)
    }
}

/// Borrowing handle; cheap to copy within one session.
#[derive(Debug)]
pub struct SharedFilePathCaching<'a, S> {
    cache: &'a FilePathCache<S>,
}

impl<S> Clone for SharedFilePathCaching<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S> Copy for SharedFilePathCaching<'_, S> {}

impl<'a, S: PathStore> SharedFilePathCaching<'a, S> {
    pub fn new(cache: &'a FilePathCache<S>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &'a FilePathCache<S> {
        self.cache
    }
}

/// Owning handle with a private cache.
#[derive(Debug)]
pub struct OwnedFilePathCaching<S> {
    cache: FilePathCache<S>,
}

impl<S: PathStore> OwnedFilePathCaching<S> {
    pub fn new(store: S) -> Result<Self> {
        Ok(Self {
            cache: FilePathCache::new(store)?,
        })
    }

    pub fn cache(&self) -> &FilePathCache<S> {
        &self.cache
    }
}

impl<S: PathStore + Clone> Clone for OwnedFilePathCaching<S> {
    fn clone(&self) -> Self {
        let cache = FilePathCache::unpopulated(self.cache.store().clone());
        if let Err(e) = cache.populate_if_empty() {
            tracing::warn!(error = %e, "cloned path cache starts cold");
        }
        Self { cache }
    }
}

macro_rules! forward_file_path_caching {
    ($ty:ty, $($generics:tt)*) => {
        impl<$($generics)*> FilePathCaching for $ty {
            fn file_path_id(&self, path: &str) -> Result<FilePathId> {
                self.cache.file_path_id(path)
            }

            fn file_path(&self, id: FilePathId) -> Result<String> {
                self.cache.file_path(id)
            }

            fn directory_path_id(&self, path: &str) -> Result<DirectoryPathId> {
                self.cache.directory_path_id(path)
            }

            fn directory_path_id_of(&self, id: FilePathId) -> DirectoryPathId {
                self.cache.directory_path_id_of(id)
            }

            fn directory_path(&self, id: DirectoryPathId) -> Result<String> {
                self.cache.directory_path(id)
            }

            fn file_path_ids(&self, paths: &[&str]) -> Result<Vec<FilePathId>> {
                self.cache.file_path_ids(paths)
            }

            fn file_paths(&self, ids: &[FilePathId]) -> Result<Vec<String>> {
                self.cache.file_paths(ids)
            }

            fn add_file_paths(&self, paths: &[&str]) -> Result<()> {
                self.cache.add_file_paths(paths)
            }

            fn populate_if_empty(&self) -> Result<()> {
                self.cache.populate_if_empty()
            }
        }
    };
}

forward_file_path_caching!(SharedFilePathCaching<'_, S>, S: PathStore);
forward_file_path_caching!(OwnedFilePathCaching<S>, S: PathStore);
