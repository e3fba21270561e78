use anyhow::{anyhow, Context, Result};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

pub const DB_FILE: &str = "index.redb";
pub const META_FILE: &str = "meta.toml";
pub const LOCK_FILE: &str = "LOCK";

fn is_name_only(s: &str) -> bool {
    !s.contains('/') && !s.contains('\\')
}

pub fn default_db_base_dir() -> Result<PathBuf> {
    let proj = ProjectDirs::from("org", "pathcache", "pathcache")
        .ok_or_else(|| anyhow!("Unable to determine platform data directory"))?;
    Ok(proj.data_dir().to_path_buf())
}

/// A bare name lives under the platform data directory; anything with a
/// separator is taken as a directory path.
pub fn resolve_db_dir(db: &str) -> Result<PathBuf> {
    if is_name_only(db) {
        Ok(default_db_base_dir()?.join(db))
    } else {
        Ok(PathBuf::from(db))
    }
}

/// Ensure the DB directory exists and has the expected files.
/// A missing or empty directory is a new DB; a non-empty directory without
/// them is refused.
pub fn ensure_db_dir_is_valid_or_empty(db_dir: &Path) -> Result<DbDirState> {
    if db_dir.exists() {
        if !db_dir.is_dir() {
            return Err(anyhow!("DB path exists but is not a directory"));
        }

        let mut entries = fs::read_dir(db_dir)
            .with_context(|| format!("Failed to read directory {}", db_dir.display()))?;

        if entries.next().is_none() {
            return Ok(DbDirState::Empty);
        }

        let has_db = db_dir.join(DB_FILE).is_file();
        let has_meta = db_dir.join(META_FILE).is_file();

        if has_db && has_meta {
            Ok(DbDirState::LooksValid)
        } else {
            Err(anyhow!(
                "Directory exists but does not look like a pathcache database (expected {} and {})",
                META_FILE,
                DB_FILE
            ))
        }
    } else {
        fs::create_dir_all(db_dir)
            .with_context(|| format!("Failed to create {}", db_dir.display()))?;
        Ok(DbDirState::Empty)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbDirState {
    /// Directory exists but is empty, or it was created just now.
    Empty,
    /// Directory contains meta.toml + index.redb.
    LooksValid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_with_separators_are_used_as_is() {
        assert_eq!(resolve_db_dir("/tmp/x/db").unwrap(), PathBuf::from("/tmp/x/db"));
    }

    #[test]
    fn missing_dir_is_created_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("new");
        assert_eq!(ensure_db_dir_is_valid_or_empty(&dir).unwrap(), DbDirState::Empty);
        assert!(dir.is_dir());
    }

    #[test]
    fn foreign_dir_is_refused() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("notes.txt"), "hello").unwrap();
        assert!(ensure_db_dir_is_valid_or_empty(tmp.path()).is_err());
    }
}
