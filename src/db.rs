use crate::dbpath::{self, DbDirState, DB_FILE, LOCK_FILE, META_FILE};
use crate::error::StoreError;
use crate::ids::DirectoryPathId;
use crate::retry::with_retry;
use crate::schema;
use crate::store::{DirectoryEntry, PathStore, SourceEntry, SourceNameAndDirectoryId};
use anyhow::{anyhow, Context, Result};
use fs2::FileExt;
use redb::{Database, ReadableTable, ReadableTableMetadata, Table, WriteTransaction};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// [`PathStore`] on top of a redb database.
///
/// Cloning is cheap and shares the database.
#[derive(Clone)]
pub struct RedbPathStore {
    db: Arc<Database>,
    db_dir: Option<PathBuf>,
    // Keep the lock file open for as long as any clone lives, so the lock is held.
    _lock_file: Option<Arc<File>>,
}

impl std::fmt::Debug for RedbPathStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbPathStore")
            .field("db_dir", &self.db_dir)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowCounts {
    pub directories: u64,
    pub sources: u64,
}

/// Open a pathcache database directory:
/// - validates directory
/// - initializes if empty (meta + index.redb)
/// - acquires exclusive lock
/// - opens redb database and creates missing tables
pub fn open(db_dir: &Path) -> Result<RedbPathStore> {
    let state = dbpath::ensure_db_dir_is_valid_or_empty(db_dir)?;

    // Lock first so two processes never initialize concurrently.
    let lock_file = open_and_lock(db_dir)?;

    if state == DbDirState::Empty {
        init_db_dir(db_dir)
            .with_context(|| format!("Failed to initialize DB in {}", db_dir.display()))?;
    }

    let db_file_path = db_dir.join(DB_FILE);
    let meta_path = db_dir.join(META_FILE);
    if !db_file_path.is_file() || !meta_path.is_file() {
        return Err(anyhow!(
            "Database directory is missing expected files ({} and {})",
            META_FILE,
            DB_FILE
        ));
    }

    let db = Database::create(&db_file_path)
        .with_context(|| format!("Failed to open redb file {}", db_file_path.display()))?;

    let store = RedbPathStore {
        db: Arc::new(db),
        db_dir: Some(db_dir.to_path_buf()),
        _lock_file: Some(Arc::new(lock_file)),
    };
    store.ensure_schema().context("Failed to create tables")?;

    tracing::debug!(db_dir = %db_dir.display(), "path store opened");
    Ok(store)
}

/// Owned handles on the directory tables of one write transaction.
struct DirectoryTables<'txn> {
    path_to_id: Table<'txn, &'static str, i32>,
    id_to_path: Table<'txn, i32, &'static str>,
    counters: Table<'txn, &'static str, i32>,
}

impl<'txn> DirectoryTables<'txn> {
    fn open(tx: &'txn WriteTransaction) -> Result<Self, StoreError> {
        Ok(Self {
            path_to_id: tx.open_table(schema::DIRECTORY_PATH_TO_ID)?,
            id_to_path: tx.open_table(schema::DIRECTORY_ID_TO_PATH)?,
            counters: tx.open_table(schema::COUNTERS)?,
        })
    }

    fn get(&self, path: &str) -> Result<Option<i32>, StoreError> {
        Ok(self.path_to_id.get(path)?.map(|v| v.value()))
    }

    fn insert(&mut self, path: &str) -> Result<i32, StoreError> {
        let id = next_id(&mut self.counters, schema::KEY_NEXT_DIRECTORY_ID)?;
        self.path_to_id.insert(path, id)?;
        self.id_to_path.insert(id, path)?;
        Ok(id)
    }
}

struct SourceTables<'txn> {
    key_to_id: Table<'txn, (i32, &'static str), i32>,
    id_to_key: Table<'txn, i32, (i32, &'static str)>,
    counters: Table<'txn, &'static str, i32>,
}

impl<'txn> SourceTables<'txn> {
    fn open(tx: &'txn WriteTransaction) -> Result<Self, StoreError> {
        Ok(Self {
            key_to_id: tx.open_table(schema::SOURCE_KEY_TO_ID)?,
            id_to_key: tx.open_table(schema::SOURCE_ID_TO_KEY)?,
            counters: tx.open_table(schema::COUNTERS)?,
        })
    }

    fn get(&self, directory_id: DirectoryPathId, name: &str) -> Result<Option<i32>, StoreError> {
        Ok(self
            .key_to_id
            .get((directory_id.id(), name))?
            .map(|v| v.value()))
    }

    fn insert(&mut self, directory_id: DirectoryPathId, name: &str) -> Result<i32, StoreError> {
        let id = next_id(&mut self.counters, schema::KEY_NEXT_SOURCE_ID)?;
        self.key_to_id.insert((directory_id.id(), name), id)?;
        self.id_to_key.insert(id, (directory_id.id(), name))?;
        Ok(id)
    }
}

fn next_id(
    counters: &mut Table<'_, &'static str, i32>,
    key: &'static str,
) -> Result<i32, StoreError> {
    // Copy the value out so the guard drops before the insert.
    let id = counters.get(key)?.map(|v| v.value()).unwrap_or(0);
    let next = id.checked_add(1).ok_or(StoreError::IdSpaceExhausted(key))?;
    counters.insert(key, next)?;
    Ok(id)
}

impl RedbPathStore {
    /// A store backed by redb's in-memory backend. Nothing is persisted.
    pub fn in_memory() -> Result<Self, StoreError> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        let store = Self {
            db: Arc::new(db),
            db_dir: None,
            _lock_file: None,
        };
        store.ensure_schema()?;
        Ok(store)
    }

    pub fn db_dir(&self) -> Option<&Path> {
        self.db_dir.as_deref()
    }

    fn ensure_schema(&self) -> Result<(), StoreError> {
        let tx = self.db.begin_write()?;
        {
            let _ = tx.open_table(schema::DIRECTORY_PATH_TO_ID)?;
            let _ = tx.open_table(schema::DIRECTORY_ID_TO_PATH)?;
            let _ = tx.open_table(schema::SOURCE_KEY_TO_ID)?;
            let _ = tx.open_table(schema::SOURCE_ID_TO_KEY)?;
            let _ = tx.open_table(schema::COUNTERS)?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn counts(&self) -> Result<RowCounts, StoreError> {
        with_retry("counts", || {
            let tx = self.db.begin_read()?;
            let directories = tx.open_table(schema::DIRECTORY_ID_TO_PATH)?.len()?;
            let sources = tx.open_table(schema::SOURCE_ID_TO_KEY)?.len()?;
            Ok(RowCounts {
                directories,
                sources,
            })
        })
    }

    fn lookup_directory_id(&self, path: &str) -> Result<Option<i32>, StoreError> {
        let tx = self.db.begin_read()?;
        let path_to_id = tx.open_table(schema::DIRECTORY_PATH_TO_ID)?;
        let id = path_to_id.get(path)?.map(|v| v.value());
        Ok(id)
    }

    fn lookup_source_id(
        &self,
        directory_id: DirectoryPathId,
        name: &str,
    ) -> Result<Option<i32>, StoreError> {
        let tx = self.db.begin_read()?;
        let key_to_id = tx.open_table(schema::SOURCE_KEY_TO_ID)?;
        let id = key_to_id.get((directory_id.id(), name))?.map(|v| v.value());
        Ok(id)
    }

    // One deferred transaction: read snapshot first, write only on a miss.
    fn try_fetch_or_create_directory_id(&self, path: &str) -> Result<DirectoryPathId, StoreError> {
        if let Some(id) = self.lookup_directory_id(path)? {
            return Ok(DirectoryPathId::new(id));
        }
        self.create_directory_row(path)
    }

    // Write half. A row that appeared since the snapshot is a constraint
    // violation; nothing is written.
    fn create_directory_row(&self, path: &str) -> Result<DirectoryPathId, StoreError> {
        let tx = self.db.begin_write()?;
        let created = {
            let mut tables = DirectoryTables::open(&tx)?;
            match tables.get(path)? {
                Some(_) => None,
                None => Some(tables.insert(path)?),
            }
        };

        match created {
            Some(id) => {
                tx.commit()?;
                tracing::debug!(path, id, "directory row created");
                Ok(DirectoryPathId::new(id))
            }
            None => {
                tx.abort()?;
                Err(StoreError::UniqueConstraintViolated)
            }
        }
    }

    fn try_fetch_or_create_source_id(
        &self,
        directory_id: DirectoryPathId,
        name: &str,
    ) -> Result<i32, StoreError> {
        if let Some(id) = self.lookup_source_id(directory_id, name)? {
            return Ok(id);
        }
        self.create_source_row(directory_id, name)
    }

    fn create_source_row(
        &self,
        directory_id: DirectoryPathId,
        name: &str,
    ) -> Result<i32, StoreError> {
        let tx = self.db.begin_write()?;
        let created = {
            let mut tables = SourceTables::open(&tx)?;
            match tables.get(directory_id, name)? {
                Some(_) => None,
                None => Some(tables.insert(directory_id, name)?),
            }
        };

        match created {
            Some(id) => {
                tx.commit()?;
                tracing::debug!(%directory_id, name, id, "source row created");
                Ok(id)
            }
            None => {
                tx.abort()?;
                Err(StoreError::UniqueConstraintViolated)
            }
        }
    }
}

impl PathStore for RedbPathStore {
    fn fetch_or_create_directory_id(&self, path: &str) -> Result<DirectoryPathId, StoreError> {
        with_retry("fetch_or_create_directory_id", || {
            self.try_fetch_or_create_directory_id(path)
        })
    }

    fn fetch_or_create_source_id(
        &self,
        directory_id: DirectoryPathId,
        name: &str,
    ) -> Result<i32, StoreError> {
        with_retry("fetch_or_create_source_id", || {
            self.try_fetch_or_create_source_id(directory_id, name)
        })
    }

    fn fetch_directory_path(&self, id: DirectoryPathId) -> Result<String, StoreError> {
        with_retry("fetch_directory_path", || {
            let tx = self.db.begin_read()?;
            let id_to_path = tx.open_table(schema::DIRECTORY_ID_TO_PATH)?;
            let path = id_to_path.get(id.id())?.map(|v| v.value().to_owned());
            path.ok_or(StoreError::DirectoryPathIdDoesNotExist(id))
        })
    }

    fn fetch_source_name_and_directory_id(
        &self,
        name_id: i32,
    ) -> Result<SourceNameAndDirectoryId, StoreError> {
        with_retry("fetch_source_name_and_directory_id", || {
            let tx = self.db.begin_read()?;
            let id_to_key = tx.open_table(schema::SOURCE_ID_TO_KEY)?;
            let Some(guard) = id_to_key.get(name_id)? else {
                return Err(StoreError::SourceNameIdDoesNotExist(name_id));
            };
            let (directory_id, name) = guard.value();
            Ok(SourceNameAndDirectoryId {
                name: name.to_owned(),
                directory_id: DirectoryPathId::new(directory_id),
            })
        })
    }

    fn fetch_all_directories(&self) -> Result<Vec<DirectoryEntry>, StoreError> {
        with_retry("fetch_all_directories", || {
            let tx = self.db.begin_read()?;
            let id_to_path = tx.open_table(schema::DIRECTORY_ID_TO_PATH)?;

            let mut out = Vec::new();
            for item in id_to_path.iter()? {
                let (id, path) = item?;
                out.push(DirectoryEntry {
                    path: path.value().to_owned(),
                    id: DirectoryPathId::new(id.value()),
                });
            }
            Ok(out)
        })
    }

    fn fetch_all_sources(&self) -> Result<Vec<SourceEntry>, StoreError> {
        with_retry("fetch_all_sources", || {
            let tx = self.db.begin_read()?;
            let id_to_key = tx.open_table(schema::SOURCE_ID_TO_KEY)?;

            let mut out = Vec::new();
            for item in id_to_key.iter()? {
                let (id, key) = item?;
                let (directory_id, name) = key.value();
                out.push(SourceEntry {
                    name: name.to_owned(),
                    directory_id: DirectoryPathId::new(directory_id),
                    id: id.value(),
                });
            }
            Ok(out)
        })
    }

    // Batches go straight to one write transaction; rows already present
    // are read back instead of conflicting.
    fn fetch_or_create_directory_ids(
        &self,
        paths: &[&str],
    ) -> Result<Vec<DirectoryPathId>, StoreError> {
        if paths.is_empty() {
            return Ok(Vec::new());
        }

        with_retry("fetch_or_create_directory_ids", || {
            let tx = self.db.begin_write()?;
            let mut created = 0usize;
            let ids = {
                let mut tables = DirectoryTables::open(&tx)?;
                let mut ids = Vec::with_capacity(paths.len());
                for path in paths {
                    let id = match tables.get(path)? {
                        Some(id) => id,
                        None => {
                            created += 1;
                            tables.insert(path)?
                        }
                    };
                    ids.push(DirectoryPathId::new(id));
                }
                ids
            };
            tx.commit()?;

            tracing::debug!(batch_size = paths.len(), created, "directory batch written");
            Ok(ids)
        })
    }

    fn fetch_or_create_source_ids(
        &self,
        sources: &[(DirectoryPathId, &str)],
    ) -> Result<Vec<i32>, StoreError> {
        if sources.is_empty() {
            return Ok(Vec::new());
        }

        with_retry("fetch_or_create_source_ids", || {
            let tx = self.db.begin_write()?;
            let mut created = 0usize;
            let ids = {
                let mut tables = SourceTables::open(&tx)?;
                let mut ids = Vec::with_capacity(sources.len());
                for &(directory_id, name) in sources {
                    let id = match tables.get(directory_id, name)? {
                        Some(id) => id,
                        None => {
                            created += 1;
                            tables.insert(directory_id, name)?
                        }
                    };
                    ids.push(id);
                }
                ids
            };
            tx.commit()?;

            tracing::debug!(batch_size = sources.len(), created, "source batch written");
            Ok(ids)
        })
    }
}

fn open_and_lock(db_dir: &Path) -> Result<File> {
    let lock_path = db_dir.join(LOCK_FILE);
    let f = OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(&lock_path)
        .with_context(|| format!("Failed to open lock file {}", lock_path.display()))?;

    // Exclusive lock: one process at a time.
    f.try_lock_exclusive()
        .with_context(|| format!("Database is locked (in use?): {}", db_dir.display()))?;

    Ok(f)
}

fn init_db_dir(db_dir: &Path) -> Result<()> {
    let meta_path = db_dir.join(META_FILE);
    if !meta_path.exists() {
        write_meta(&meta_path)?;
    }

    let db_file_path = db_dir.join(DB_FILE);
    if !db_file_path.exists() {
        let _ = Database::create(&db_file_path)
            .with_context(|| format!("Failed to initialize redb at {}", db_file_path.display()))?;
    }

    Ok(())
}

fn write_meta(meta_path: &Path) -> Result<()> {
    let mut f = File::create(meta_path)
        .with_context(|| format!("Failed to create {}", meta_path.display()))?;

    let created = chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%:z");
    let contents = format!(
        r#"# pathcache database metadata
format = 1
app = "pathcache"
db_kind = "redb"
name_ids = "global"
created = "{created}"
"#
    );

    f.write_all(contents.as_bytes())
        .with_context(|| format!("Failed to write {}", meta_path.display()))?;

    f.sync_all()
        .with_context(|| format!("Failed to sync {}", meta_path.display()))?;

    Ok(())
}
