//! Path <-> id translation over two interners.
//!
//! A path is split into directory and leaf name. The directory is interned
//! on its own; the name is interned together with the directory id, so the
//! same name under two directories gets two ids. Name ids come from one
//! global counter in the store, which lets a name id alone resolve back to
//! its `(directory, name)` row.

use crate::error::{PathCacheError, Result};
use crate::file_path::{self, FilePathView};
use crate::ids::{DirectoryPathId, FilePathId};
use crate::interner::{InternKey, KeyOrder, OrderedInterner};
use crate::store::PathStore;
use std::cmp::Ordering;
use std::fmt;

/// Key of the file name interner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNameKey {
    pub directory_id: DirectoryPathId,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileNameView<'a> {
    pub directory_id: DirectoryPathId,
    pub name: &'a str,
}

impl InternKey for FileNameKey {
    type View<'a>
        = FileNameView<'a>
    where
        Self: 'a;

    fn view(&self) -> FileNameView<'_> {
        FileNameView {
            directory_id: self.directory_id,
            name: &self.name,
        }
    }

    fn from_view(view: FileNameView<'_>) -> Self {
        Self {
            directory_id: view.directory_id,
            name: view.name.to_owned(),
        }
    }
}

/// Directory paths share long prefixes, so compare length first and then
/// bytes from the end.
pub fn compare_directory_paths(a: &str, b: &str) -> Ordering {
    a.len()
        .cmp(&b.len())
        .then_with(|| a.bytes().rev().cmp(b.bytes().rev()))
}

/// Directory id, then name length, then name bytes.
pub fn compare_file_names(a: FileNameView<'_>, b: FileNameView<'_>) -> Ordering {
    a.directory_id
        .cmp(&b.directory_id)
        .then_with(|| a.name.len().cmp(&b.name.len()))
        .then_with(|| a.name.cmp(b.name))
}

pub struct DirectoryPathOrder;

impl KeyOrder<String> for DirectoryPathOrder {
    fn compare(a: &str, b: &str) -> Ordering {
        compare_directory_paths(a, b)
    }
}

pub struct FileNameOrder;

impl KeyOrder<FileNameKey> for FileNameOrder {
    fn compare(a: FileNameView<'_>, b: FileNameView<'_>) -> Ordering {
        compare_file_names(a, b)
    }
}

pub struct FilePathCache<S> {
    directories: OrderedInterner<String, DirectoryPathOrder>,
    file_names: OrderedInterner<FileNameKey, FileNameOrder>,
    store: S,
}

impl<S: PathStore> FilePathCache<S> {
    /// Creates the cache and loads every row the store already has.
    pub fn new(store: S) -> Result<Self> {
        let cache = Self::unpopulated(store);
        cache.populate_if_empty()?;
        Ok(cache)
    }

    /// Creates an empty cache. Misses are resolved against the store.
    pub fn unpopulated(store: S) -> Self {
        Self {
            directories: OrderedInterner::new(),
            file_names: OrderedInterner::new(),
            store,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Fails with [`PathCacheError::NoDirectory`] for a bare name, which
    /// would otherwise share the empty directory with `"/name"`.
    pub fn file_path_id(&self, path: &str) -> Result<FilePathId> {
        let view = directory_view(path)?;
        let directory_id = self.directory_path_id(view.directory())?;
        let name_id = self.file_name_id(directory_id, view.name())?;
        Ok(FilePathId::new(directory_id.id(), name_id))
    }

    pub fn directory_path_id(&self, path: &str) -> Result<DirectoryPathId> {
        let id = self.directories.id_with(path, || {
            self.store
                .fetch_or_create_directory_id(path)
                .map(DirectoryPathId::id)
        })?;
        Ok(DirectoryPathId::new(id))
    }

    /// Pure projection, no lookup.
    pub fn directory_path_id_of(&self, id: FilePathId) -> DirectoryPathId {
        id.directory_path_id()
    }

    fn file_name_id(&self, directory_id: DirectoryPathId, name: &str) -> Result<i32> {
        let view = FileNameView { directory_id, name };
        let id = self.file_names.id_with(view, || {
            self.store.fetch_or_create_source_id(directory_id, name)
        })?;
        Ok(id)
    }

    /// Fails with [`PathCacheError::InvalidId`] before any lookup if either
    /// component is negative, or if the name does not belong to the
    /// directory of `id`.
    pub fn file_path(&self, id: FilePathId) -> Result<String> {
        if !id.is_valid() {
            return Err(PathCacheError::InvalidId);
        }

        let name = self.file_names.string_or_fetch(id.name_id, |name_id| {
            let row = self.store.fetch_source_name_and_directory_id(name_id)?;
            Ok::<_, PathCacheError>(FileNameKey {
                directory_id: row.directory_id,
                name: row.name,
            })
        })?;
        if name.directory_id != id.directory_path_id() {
            return Err(PathCacheError::InvalidId);
        }

        let directory = self.directory_path(id.directory_path_id())?;
        Ok(file_path::join(&directory, &name.name))
    }

    pub fn directory_path(&self, id: DirectoryPathId) -> Result<String> {
        if !id.is_valid() {
            return Err(PathCacheError::InvalidId);
        }

        let path = self.directories.string_or_fetch(id.id(), |id| {
            Ok::<_, PathCacheError>(self.store.fetch_directory_path(DirectoryPathId::new(id))?)
        })?;
        Ok(String::clone(&path))
    }

    pub fn file_path_ids<P: AsRef<str>>(&self, paths: &[P]) -> Result<Vec<FilePathId>> {
        paths
            .iter()
            .map(|path| self.file_path_id(path.as_ref()))
            .collect()
    }

    pub fn file_paths(&self, ids: &[FilePathId]) -> Result<Vec<String>> {
        ids.iter().map(|&id| self.file_path(id)).collect()
    }

    /// Interns `paths`, writing all new directory rows in one store batch
    /// and then all new name rows in another. A bare name anywhere in
    /// `paths` fails the call before anything is written.
    pub fn add_file_paths<P: AsRef<str>>(&self, paths: &[P]) -> Result<()> {
        let views = paths
            .iter()
            .map(|path| directory_view(path.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        let mut new_directories: Vec<&str> = views
            .iter()
            .map(|view| view.directory())
            .filter(|directory| self.directories.find(*directory).is_none())
            .collect();
        new_directories.sort_unstable_by(|a, b| compare_directory_paths(a, b));
        new_directories.dedup();

        if !new_directories.is_empty() {
            let ids = self.store.fetch_or_create_directory_ids(&new_directories)?;
            self.directories.insert_entries(
                new_directories
                    .iter()
                    .zip(ids)
                    .map(|(path, id)| ((*path).to_owned(), id.id())),
            );
        }

        let mut new_names: Vec<FileNameView<'_>> = Vec::new();
        for view in &views {
            // Cached by now unless a concurrent clear() dropped it.
            let directory_id = self.directory_path_id(view.directory())?;
            let name = FileNameView {
                directory_id,
                name: view.name(),
            };
            if self.file_names.find(name).is_none() {
                new_names.push(name);
            }
        }
        new_names.sort_unstable_by(|a, b| compare_file_names(*a, *b));
        new_names.dedup();

        if !new_names.is_empty() {
            let keys: Vec<(DirectoryPathId, &str)> = new_names
                .iter()
                .map(|name| (name.directory_id, name.name))
                .collect();
            let ids = self.store.fetch_or_create_source_ids(&keys)?;
            self.file_names.insert_entries(
                new_names
                    .iter()
                    .zip(ids)
                    .map(|(name, id)| (FileNameKey::from_view(*name), id)),
            );
        }

        tracing::debug!(
            paths = paths.len(),
            new_directories = new_directories.len(),
            new_names = new_names.len(),
            "file paths added"
        );
        Ok(())
    }

    /// Bulk-loads all store rows into whichever interner is still empty.
    pub fn populate_if_empty(&self) -> Result<()> {
        if self.directories.is_empty() {
            let rows = self.store.fetch_all_directories()?;
            let added = self
                .directories
                .insert_entries(rows.into_iter().map(|row| (row.path, row.id.id())));
            tracing::debug!(directories = added, "directory cache populated");
        }

        if self.file_names.is_empty() {
            let rows = self.store.fetch_all_sources()?;
            let added = self.file_names.insert_entries(rows.into_iter().map(|row| {
                let key = FileNameKey {
                    directory_id: row.directory_id,
                    name: row.name,
                };
                (key, row.id)
            }));
            tracing::debug!(file_names = added, "file name cache populated");
        }

        Ok(())
    }

    /// Drops every in-memory entry. Later lookups go back to the store.
    pub fn clear(&self) {
        self.directories.clear();
        self.file_names.clear();
    }

    pub fn directory_count(&self) -> usize {
        self.directories.len()
    }

    pub fn file_name_count(&self) -> usize {
        self.file_names.len()
    }
}

fn directory_view(path: &str) -> Result<FilePathView<'_>> {
    let view = FilePathView::new(path);
    if !view.has_directory() {
        return Err(PathCacheError::NoDirectory(path.to_owned()));
    }
    Ok(view)
}

impl<S> fmt::Debug for FilePathCache<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilePathCache")
            .field("directories", &self.directories)
            .field("file_names", &self.file_names)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::RedbPathStore;
    use crate::error::StoreError;
    use std::sync::Barrier;

    fn cache() -> FilePathCache<RedbPathStore> {
        FilePathCache::new(RedbPathStore::in_memory().unwrap()).unwrap()
    }

    #[test]
    fn scenario_with_global_name_ids() {
        let c = cache();

        assert_eq!(c.file_path_id("/a/b/c.cpp").unwrap(), FilePathId::new(0, 0));
        assert_eq!(c.file_path_id("/a/b/c.cpp").unwrap(), FilePathId::new(0, 0));
        assert_eq!(c.file_path_id("/a/b/d.cpp").unwrap(), FilePathId::new(0, 1));
        assert_eq!(c.file_path_id("/a/x/c.cpp").unwrap(), FilePathId::new(1, 2));
    }

    #[test]
    fn paths_round_trip() {
        let c = cache();
        for path in ["/a/b/c.cpp", "/c.cpp", "/usr/include/c++/v1/vector", "rel/dir/x.h"] {
            let id = c.file_path_id(path).unwrap();
            assert_eq!(c.file_path(id).unwrap(), path);
        }
    }

    #[test]
    fn bare_name_is_refused_and_root_level_path_is_not() {
        let c = cache();
        assert!(matches!(
            c.file_path_id("c.cpp"),
            Err(PathCacheError::NoDirectory(p)) if p == "c.cpp"
        ));

        let rooted = c.file_path_id("/c.cpp").unwrap();
        assert_eq!(c.file_path(rooted).unwrap(), "/c.cpp");
        assert_eq!(c.directory_path(rooted.directory_path_id()).unwrap(), "");
        assert_eq!(c.file_name_count(), 1);
        assert_eq!(c.store().counts().unwrap().sources, 1);
    }

    #[test]
    fn batch_with_a_bare_name_writes_nothing() {
        let c = cache();
        assert!(matches!(
            c.add_file_paths(&["/a/x.c", "x.c"]),
            Err(PathCacheError::NoDirectory(_))
        ));
        assert_eq!(c.directory_count(), 0);
        assert_eq!(c.store().counts().unwrap().directories, 0);
    }

    #[test]
    fn negative_ids_never_reach_the_fetch() {
        let c = cache();
        let r = c
            .directories
            .string_or_fetch(-1, |_| -> Result<String> { panic!("fetch called") });
        assert!(matches!(r, Err(PathCacheError::UnknownId(-1))));
    }

    #[test]
    fn directory_projection_matches_directory_lookup() {
        let c = cache();
        let id = c.file_path_id("/src/lib/mod.rs").unwrap();
        assert_eq!(c.directory_path_id_of(id), c.directory_path_id("/src/lib").unwrap());
        assert_eq!(c.directory_path(c.directory_path_id_of(id)).unwrap(), "/src/lib");
    }

    #[test]
    fn invalid_ids_are_rejected() {
        let c = cache();
        assert!(matches!(c.file_path(FilePathId::default()), Err(PathCacheError::InvalidId)));
        assert!(matches!(c.file_path(FilePathId::new(0, -1)), Err(PathCacheError::InvalidId)));
        assert!(matches!(
            c.directory_path(DirectoryPathId::default()),
            Err(PathCacheError::InvalidId)
        ));
    }

    #[test]
    fn name_from_another_directory_is_rejected() {
        let c = cache();
        let a = c.file_path_id("/a/x.c").unwrap();
        let b = c.file_path_id("/b/y.c").unwrap();
        let mixed = FilePathId::new(a.directory_id, b.name_id);
        assert!(matches!(c.file_path(mixed), Err(PathCacheError::InvalidId)));
    }

    #[test]
    fn unknown_rows_surface_store_errors() {
        let c = cache();
        assert!(matches!(
            c.directory_path(DirectoryPathId::new(40)),
            Err(PathCacheError::Store(StoreError::DirectoryPathIdDoesNotExist(_)))
        ));
        assert!(matches!(
            c.file_path(FilePathId::new(0, 40)),
            Err(PathCacheError::Store(StoreError::SourceNameIdDoesNotExist(40)))
        ));
    }

    #[test]
    fn ids_are_stable_across_clear() {
        let c = cache();
        let before = c.file_path_ids(&["/a/b/c.cpp", "/a/x/y.h"]).unwrap();
        c.clear();
        assert_eq!(c.directory_count(), 0);

        let after = c.file_path_ids(&["/a/b/c.cpp", "/a/x/y.h"]).unwrap();
        assert_eq!(before, after);
        assert_eq!(c.file_paths(&after).unwrap(), ["/a/b/c.cpp", "/a/x/y.h"]);
    }

    #[test]
    fn resolves_ids_created_by_another_cache() {
        let store = RedbPathStore::in_memory().unwrap();
        let writer = FilePathCache::new(store.clone()).unwrap();
        let reader = FilePathCache::new(store).unwrap();

        let id = writer.file_path_id("/late/row.cpp").unwrap();
        assert_eq!(reader.file_name_count(), 0);
        assert_eq!(reader.file_path(id).unwrap(), "/late/row.cpp");
        assert_eq!(reader.file_path_id("/late/row.cpp").unwrap(), id);
    }

    #[test]
    fn warm_up_loads_existing_rows() {
        let store = RedbPathStore::in_memory().unwrap();
        let first = FilePathCache::new(store.clone()).unwrap();
        let ids = first.file_path_ids(&["/a/b/c.cpp", "/a/b/d.cpp", "/e/f.h"]).unwrap();

        let second = FilePathCache::new(store).unwrap();
        assert_eq!(second.directory_count(), 2);
        assert_eq!(second.file_name_count(), 3);
        assert_eq!(second.file_path_ids(&["/a/b/c.cpp", "/a/b/d.cpp", "/e/f.h"]).unwrap(), ids);
    }

    #[test]
    fn add_file_paths_matches_scalar_interning() {
        let paths = ["/p/q/1.c", "/p/q/2.c", "/p/r/1.c", "/p/q/1.c", "top.c"];

        let batched = cache();
        batched.add_file_paths(&paths).unwrap();
        assert_eq!(batched.directory_count(), 3);
        assert_eq!(batched.file_name_count(), 4);

        let ids = batched.file_path_ids(&paths).unwrap();
        assert_eq!(ids[0], ids[3]);
        assert_eq!(batched.file_paths(&ids[..3]).unwrap(), &paths[..3]);
        assert_eq!(batched.store().counts().unwrap().sources, 4);
    }

    #[test]
    fn concurrent_lookups_of_a_new_path_agree() {
        const THREADS: usize = 8;
        let c = cache();
        let barrier = Barrier::new(THREADS);

        let ids: Vec<FilePathId> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        c.file_path_id("/race/same.cpp").unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(ids.iter().all(|id| *id == ids[0]));
        let counts = c.store().counts().unwrap();
        assert_eq!(counts.directories, 1);
        assert_eq!(counts.sources, 1);
    }

    #[test]
    fn file_names_group_by_directory() {
        let view = |d, name| FileNameView { directory_id: DirectoryPathId::new(d), name };
        assert_eq!(compare_file_names(view(0, "zzz"), view(1, "a")), Ordering::Less);
        assert_eq!(compare_file_names(view(1, "b"), view(1, "aa")), Ordering::Less);
        assert_eq!(compare_file_names(view(1, "ab"), view(1, "aa")), Ordering::Greater);
    }

    #[test]
    fn directory_order_compares_from_the_end() {
        assert_eq!(compare_directory_paths("/a/x", "/b/a"), Ordering::Greater);
        assert_eq!(compare_directory_paths("/zz", "/a/b"), Ordering::Less);
        assert_eq!(compare_directory_paths("/a", "/a"), Ordering::Equal);
    }
}
