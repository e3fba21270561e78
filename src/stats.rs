use anyhow::{Context, Result};
use pathcache::dbpath::META_FILE;
use pathcache::{FilePathCache, RedbPathStore};
use std::path::PathBuf;

#[derive(Debug, Default, Clone)]
pub struct Stats {
    pub db_dir: Option<PathBuf>,
    pub meta: Option<String>,

    // rows in the store
    pub directory_rows: u64,
    pub source_rows: u64,

    // entries loaded in this process
    pub cached_directories: usize,
    pub cached_file_names: usize,
}

pub fn compute(cache: &FilePathCache<RedbPathStore>) -> Result<Stats> {
    let store = cache.store();
    let counts = store.counts().context("Failed to count rows")?;

    let meta = match store.db_dir() {
        Some(dir) => {
            let path = dir.join(META_FILE);
            Some(
                std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
            )
        }
        None => None,
    };

    Ok(Stats {
        db_dir: store.db_dir().map(|d| d.to_path_buf()),
        meta,
        directory_rows: counts.directories,
        source_rows: counts.sources,
        cached_directories: cache.directory_count(),
        cached_file_names: cache.file_name_count(),
    })
}

pub fn print(s: &Stats) {
    match &s.db_dir {
        Some(dir) => println!("DB directory:        {}", dir.display()),
        None => println!("DB directory:        <in memory>"),
    }
    println!();

    println!("Directories stored:  {}", s.directory_rows);
    println!("File names stored:   {}", s.source_rows);
    println!("Directories cached:  {}", s.cached_directories);
    println!("File names cached:   {}", s.cached_file_names);

    if let Some(meta) = &s.meta {
        println!();
        println!("{}:", META_FILE);
        for line in meta.lines().filter(|l| !l.starts_with('#') && !l.trim().is_empty()) {
            println!("  {line}");
        }
    }
}
