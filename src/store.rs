use crate::error::StoreError;
use crate::ids::DirectoryPathId;

/// A row of the `directories` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub path: String,
    pub id: DirectoryPathId,
}

/// A row of the `sources` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    pub name: String,
    pub directory_id: DirectoryPathId,
    pub id: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceNameAndDirectoryId {
    pub name: String,
    pub directory_id: DirectoryPathId,
}

/// Persistent backing of the path cache.
///
/// The fetch-or-create operations must be race free across threads: two
/// callers creating the same row concurrently both get the same id, and
/// exactly one row exists afterwards. Transient conflicts are retried inside
/// the store (see [`with_retry`](crate::retry::with_retry)) and never reach
/// the caller.
pub trait PathStore: Send + Sync {
    fn fetch_or_create_directory_id(&self, path: &str) -> Result<DirectoryPathId, StoreError>;

    fn fetch_or_create_source_id(
        &self,
        directory_id: DirectoryPathId,
        name: &str,
    ) -> Result<i32, StoreError>;

    fn fetch_directory_path(&self, id: DirectoryPathId) -> Result<String, StoreError>;

    fn fetch_source_name_and_directory_id(
        &self,
        name_id: i32,
    ) -> Result<SourceNameAndDirectoryId, StoreError>;

    fn fetch_all_directories(&self) -> Result<Vec<DirectoryEntry>, StoreError>;

    fn fetch_all_sources(&self) -> Result<Vec<SourceEntry>, StoreError>;

    /// Batched form of [`fetch_or_create_directory_id`](Self::fetch_or_create_directory_id).
    /// Ids are returned in input order.
    fn fetch_or_create_directory_ids(
        &self,
        paths: &[&str],
    ) -> Result<Vec<DirectoryPathId>, StoreError> {
        paths
            .iter()
            .map(|path| self.fetch_or_create_directory_id(path))
            .collect()
    }

    /// Batched form of [`fetch_or_create_source_id`](Self::fetch_or_create_source_id).
    fn fetch_or_create_source_ids(
        &self,
        sources: &[(DirectoryPathId, &str)],
    ) -> Result<Vec<i32>, StoreError> {
        sources
            .iter()
            .map(|&(directory_id, name)| self.fetch_or_create_source_id(directory_id, name))
            .collect()
    }
}

impl<S: PathStore + ?Sized> PathStore for &S {
    fn fetch_or_create_directory_id(&self, path: &str) -> Result<DirectoryPathId, StoreError> {
        (**self).fetch_or_create_directory_id(path)
    }

    fn fetch_or_create_source_id(
        &self,
        directory_id: DirectoryPathId,
        name: &str,
    ) -> Result<i32, StoreError> {
        (**self).fetch_or_create_source_id(directory_id, name)
    }

    fn fetch_directory_path(&self, id: DirectoryPathId) -> Result<String, StoreError> {
        (**self).fetch_directory_path(id)
    }

    fn fetch_source_name_and_directory_id(
        &self,
        name_id: i32,
    ) -> Result<SourceNameAndDirectoryId, StoreError> {
        (**self).fetch_source_name_and_directory_id(name_id)
    }

    fn fetch_all_directories(&self) -> Result<Vec<DirectoryEntry>, StoreError> {
        (**self).fetch_all_directories()
    }

    fn fetch_all_sources(&self) -> Result<Vec<SourceEntry>, StoreError> {
        (**self).fetch_all_sources()
    }

    fn fetch_or_create_directory_ids(
        &self,
        paths: &[&str],
    ) -> Result<Vec<DirectoryPathId>, StoreError> {
        (**self).fetch_or_create_directory_ids(paths)
    }

    fn fetch_or_create_source_ids(
        &self,
        sources: &[(DirectoryPathId, &str)],
    ) -> Result<Vec<i32>, StoreError> {
        (**self).fetch_or_create_source_ids(sources)
    }
}
