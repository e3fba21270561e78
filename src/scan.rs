use crate::path_utils;
use anyhow::{anyhow, Context, Result};
use crossbeam_channel as chan;
use indicatif::{ProgressBar, ProgressStyle};
use pathcache::{FilePathCaching, PathStore, SharedFilePathCaching};
use std::collections::HashSet;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub threads: usize,
    pub follow_symlinks: bool,
    pub recursive: bool,
    pub batch_size: usize,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanSummary {
    pub interned: u64,
    pub skipped: u64,
}

/// Walk `roots` and intern every regular file found.
///
/// The walker feeds a bounded channel; `threads` workers drain it in
/// batches of `batch_size` and intern them through the shared cache.
pub fn run_scan<S: PathStore>(
    caching: SharedFilePathCaching<'_, S>,
    roots: Vec<PathBuf>,
    opts: &ScanOptions,
) -> Result<ScanSummary> {
    let threads = opts.threads.max(1);
    let batch_size = opts.batch_size.max(1);
    let (job_tx, job_rx) = chan::bounded::<String>(threads * batch_size * 2);

    let progress = ProgressBar::new_spinner();
    progress.set_style(
        ProgressStyle::with_template("{spinner} {pos} paths interned ({per_sec})")
            .context("bad progress template")?,
    );
    progress.enable_steady_tick(Duration::from_millis(120));

    let summary = thread::scope(|scope| -> Result<ScanSummary> {
        let mut workers = Vec::with_capacity(threads);
        for _ in 0..threads {
            let rx = job_rx.clone();
            let progress = progress.clone();
            workers.push(scope.spawn(move || worker_loop(caching, rx, batch_size, &progress)));
        }
        drop(job_rx);

        // Producer runs on this thread; dropping the sender lets workers drain and exit.
        let walked = walk_and_enqueue(roots, opts, &job_tx);
        drop(job_tx);

        let mut interned = 0u64;
        for h in workers {
            interned += h
                .join()
                .map_err(|_| anyhow!("scan worker panicked"))??;
        }

        let skipped = walked?;
        Ok(ScanSummary { interned, skipped })
    })?;

    progress.finish_and_clear();
    tracing::info!(interned = summary.interned, skipped = summary.skipped, "scan finished");
    Ok(summary)
}

fn worker_loop<S: PathStore>(
    caching: SharedFilePathCaching<'_, S>,
    rx: chan::Receiver<String>,
    batch_size: usize,
    progress: &ProgressBar,
) -> Result<u64> {
    let mut interned = 0u64;
    let mut batch: Vec<String> = Vec::with_capacity(batch_size);

    loop {
        batch.clear();
        match rx.recv() {
            Ok(path) => batch.push(path),
            Err(_) => break,
        }
        while batch.len() < batch_size {
            match rx.try_recv() {
                Ok(path) => batch.push(path),
                Err(_) => break,
            }
        }

        let refs: Vec<&str> = batch.iter().map(String::as_str).collect();
        caching
            .add_file_paths(&refs)
            .with_context(|| format!("failed to intern batch starting at {}", refs[0]))?;

        interned += refs.len() as u64;
        progress.inc(refs.len() as u64);
    }

    Ok(interned)
}

/// Returns the number of entries skipped (unreadable or non-UTF-8).
fn walk_and_enqueue(
    roots: Vec<PathBuf>,
    opts: &ScanOptions,
    job_tx: &chan::Sender<String>,
) -> Result<u64> {
    let mut skipped = 0u64;
    let mut visited_dirs: HashSet<(u64, u64)> = HashSet::new();

    for root in roots {
        let root = path_utils::normalize_path(&root)
            .with_context(|| format!("Failed to normalize {}", root.display()))?;

        let walker = walkdir::WalkDir::new(&root)
            .follow_links(opts.follow_symlinks)
            .max_depth(if opts.recursive { usize::MAX } else { 1 })
            .into_iter()
            .filter_entry(|e| filter_dir_entry(e, &mut visited_dirs));

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::debug!(error = %e, "skipping unreadable entry");
                    skipped += 1;
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            match path_utils::path_key(entry.path()) {
                Ok(key) => {
                    if job_tx.send(key).is_err() {
                        // all workers gone; their error surfaces on join
                        return Ok(skipped);
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "skipping path");
                    skipped += 1;
                }
            }
        }
    }

    Ok(skipped)
}

// Symlinked directory cycles: visit each (dev, inode) once.
fn filter_dir_entry(e: &walkdir::DirEntry, visited_dirs: &mut HashSet<(u64, u64)>) -> bool {
    if e.file_type().is_dir() {
        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            if let Ok(md) = e.metadata() {
                return visited_dirs.insert((md.dev(), md.ino()));
            }
        }
    }
    true
}
