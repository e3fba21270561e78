#![allow(dead_code)]

use pathcache::store::{DirectoryEntry, SourceEntry, SourceNameAndDirectoryId};
use pathcache::{DirectoryPathId, PathStore, RedbPathStore, StoreError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct Calls {
    pub creates: AtomicUsize,
    pub fetches: AtomicUsize,
    pub scans: AtomicUsize,
}

impl Calls {
    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        self.creates() + self.fetches() + self.scans.load(Ordering::SeqCst)
    }
}

/// Forwards to a [`RedbPathStore`] and counts every call by kind.
#[derive(Debug, Clone)]
pub struct CountingStore {
    inner: RedbPathStore,
    pub calls: Arc<Calls>,
}

impl CountingStore {
    pub fn new(inner: RedbPathStore) -> Self {
        Self {
            inner,
            calls: Arc::default(),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(RedbPathStore::in_memory().unwrap())
    }

    pub fn inner(&self) -> &RedbPathStore {
        &self.inner
    }

    fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::SeqCst);
    }
}

impl PathStore for CountingStore {
    fn fetch_or_create_directory_id(&self, path: &str) -> Result<DirectoryPathId, StoreError> {
        Self::bump(&self.calls.creates);
        self.inner.fetch_or_create_directory_id(path)
    }

    fn fetch_or_create_source_id(
        &self,
        directory_id: DirectoryPathId,
        name: &str,
    ) -> Result<i32, StoreError> {
        Self::bump(&self.calls.creates);
        self.inner.fetch_or_create_source_id(directory_id, name)
    }

    fn fetch_directory_path(&self, id: DirectoryPathId) -> Result<String, StoreError> {
        Self::bump(&self.calls.fetches);
        self.inner.fetch_directory_path(id)
    }

    fn fetch_source_name_and_directory_id(
        &self,
        name_id: i32,
    ) -> Result<SourceNameAndDirectoryId, StoreError> {
        Self::bump(&self.calls.fetches);
        self.inner.fetch_source_name_and_directory_id(name_id)
    }

    fn fetch_all_directories(&self) -> Result<Vec<DirectoryEntry>, StoreError> {
        Self::bump(&self.calls.scans);
        self.inner.fetch_all_directories()
    }

    fn fetch_all_sources(&self) -> Result<Vec<SourceEntry>, StoreError> {
        Self::bump(&self.calls.scans);
        self.inner.fetch_all_sources()
    }

    fn fetch_or_create_directory_ids(
        &self,
        paths: &[&str],
    ) -> Result<Vec<DirectoryPathId>, StoreError> {
        Self::bump(&self.calls.creates);
        self.inner.fetch_or_create_directory_ids(paths)
    }

    fn fetch_or_create_source_ids(
        &self,
        sources: &[(DirectoryPathId, &str)],
    ) -> Result<Vec<i32>, StoreError> {
        Self::bump(&self.calls.creates);
        self.inner.fetch_or_create_source_ids(sources)
    }
}
