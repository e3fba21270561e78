use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use pathcache::{FilePathCache, FilePathId, PathStore, RedbPathStore, SharedFilePathCaching};
use std::path::PathBuf;

mod logging;
mod path_filter;
mod path_utils;
mod scan;
mod stats;

#[derive(Parser, Debug)]
#[command(name = "pathcache")]
#[command(version, about = "Stable integer ids for file and directory paths")]
struct Cli {
    /// Database name (no slashes) or path to a database directory.
    ///
    /// If it contains no path separators, it is treated as a name and placed under
    /// the default pathcache data directory (platform-specific).
    #[arg(long, default_value = "default")]
    db: String,

    /// Increase logging verbosity (use together with RUST_LOG for fine control).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Intern paths and print their ids
    Intern {
        /// Paths to intern (need not exist on disk)
        paths: Vec<PathBuf>,

        /// Print the 8-byte binary form as hex instead of `directory:name`
        #[arg(long, default_value_t = false)]
        hex: bool,

        /// Intern the strings exactly as given, without making them absolute
        #[arg(long, default_value_t = false)]
        raw: bool,
    },

    /// Print the path for ids given as `directory:name` or as hex of the
    /// binary form (several 8-byte records may be concatenated)
    Resolve {
        ids: Vec<String>,
    },

    /// Walk directories and intern every file found
    Scan {
        /// One or more root paths to scan
        paths: Vec<PathBuf>,

        /// Number of interning worker threads (defaults to CPU count - 1, min 1)
        #[arg(long)]
        threads: Option<usize>,

        /// Follow symlinks during traversal
        #[arg(long, default_value_t = false)]
        follow_symlinks: bool,

        /// Do not recurse; only scan immediate entries of the given directories
        #[arg(long, default_value_t = false)]
        no_recursive: bool,

        /// Paths handed to the store per write transaction
        #[arg(long, default_value_t = 512)]
        batch: usize,
    },

    /// List stored file paths with their ids
    Dump {
        /// Optional path prefixes to filter by
        paths: Vec<PathBuf>,
    },

    /// Print database location, metadata and row counts
    Info,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose)?;

    let db_dir = pathcache::dbpath::resolve_db_dir(&cli.db)
        .with_context(|| format!("Failed to resolve --db {}", cli.db))?;

    let store = pathcache::db::open(&db_dir)
        .with_context(|| format!("Failed to open database in {}", db_dir.display()))?;
    let cache = FilePathCache::new(store).context("Failed to load path cache")?;

    match cli.cmd {
        Command::Intern { paths, hex, raw } => {
            if paths.is_empty() {
                bail!("intern requires at least one path");
            }

            let keys = paths
                .iter()
                .map(|p| {
                    if raw {
                        path_utils::path_key(p)
                    } else {
                        path_utils::normalized_key(p)
                    }
                })
                .collect::<Result<Vec<_>>>()?;

            let ids = cache.file_path_ids(&keys)?;
            for (key, id) in keys.iter().zip(&ids) {
                if hex {
                    println!("{} {}", hex::encode(id.to_bytes()), key);
                } else {
                    println!("{} {}", id, key);
                }
            }
            Ok(())
        }

        Command::Resolve { ids } => {
            for raw in &ids {
                let parsed = parse_file_path_ids(raw)
                    .with_context(|| format!("Invalid id: {raw}"))?;
                for id in parsed {
                    let path = cache
                        .file_path(id)
                        .with_context(|| format!("Failed to resolve {id}"))?;
                    println!("{} {}", id, path);
                }
            }
            Ok(())
        }

        Command::Scan {
            paths,
            threads,
            follow_symlinks,
            no_recursive,
            batch,
        } => {
            if paths.is_empty() {
                return Err(anyhow!("scan requires at least one path"));
            }

            let threads = match threads {
                Some(n) => n.max(1),
                None => std::thread::available_parallelism()
                    .map(|n| n.get().saturating_sub(1).max(1))
                    .unwrap_or(1),
            };

            tracing::info!(
                db_dir = %db_dir.display(),
                threads,
                follow_symlinks,
                recursive = !no_recursive,
                count = paths.len(),
                "scan starting"
            );

            let opts = scan::ScanOptions {
                threads,
                follow_symlinks,
                recursive: !no_recursive,
                batch_size: batch,
            };
            let summary = scan::run_scan(SharedFilePathCaching::new(&cache), paths, &opts)?;
            println!(
                "Interned {} files ({} skipped).",
                summary.interned, summary.skipped
            );
            Ok(())
        }

        Command::Dump { paths } => {
            let filter = path_filter::PathFilter::new(&paths)?;
            dump(&cache, &filter)
        }

        Command::Info => {
            let s = stats::compute(&cache)?;
            stats::print(&s);
            Ok(())
        }
    }
}

fn dump(cache: &FilePathCache<RedbPathStore>, filter: &path_filter::PathFilter) -> Result<()> {
    let sources = cache
        .store()
        .fetch_all_sources()
        .context("Failed to read file names")?;

    let mut rows = Vec::with_capacity(sources.len());
    for row in sources {
        let id = FilePathId::new(row.directory_id.id(), row.id);
        let path = cache.file_path(id)?;
        if filter.matches(&path) {
            rows.push((path, id));
        }
    }

    rows.sort_by(|a, b| a.0.cmp(&b.0));
    for (path, id) in &rows {
        println!("{} {}", id, path);
    }
    Ok(())
}

/// `d:n`, or hex of one or more packed 8-byte records.
fn parse_file_path_ids(s: &str) -> Result<Vec<FilePathId>> {
    let ids = if let Some((d, n)) = s.split_once(':') {
        vec![FilePathId::new(d.trim().parse()?, n.trim().parse()?)]
    } else {
        let bytes = hex::decode(s.trim())?;
        if bytes.is_empty() {
            bail!("empty id");
        }
        pathcache::codec::file_path_ids_unpack(&bytes)?
    };

    if ids.iter().any(|id| !id.is_valid()) {
        bail!("id has a negative component");
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_parse_in_both_forms() {
        assert_eq!(parse_file_path_ids("3:14").unwrap(), [FilePathId::new(3, 14)]);
        assert_eq!(
            parse_file_path_ids("030000000e000000").unwrap(),
            [FilePathId::new(3, 14)]
        );
        assert_eq!(
            parse_file_path_ids("030000000e0000000000000001000000").unwrap(),
            [FilePathId::new(3, 14), FilePathId::new(0, 1)]
        );
    }

    #[test]
    fn malformed_ids_are_refused() {
        assert!(parse_file_path_ids("3").is_err());
        assert!(parse_file_path_ids("").is_err());
        assert!(parse_file_path_ids("-1:2").is_err());
        assert!(parse_file_path_ids("x:2").is_err());
        assert!(parse_file_path_ids("0300").is_err());
        assert!(parse_file_path_ids("ffffffff00000000").is_err());
    }
}
