use anyhow::{anyhow, Context, Result};
use std::path::{Component, Path, PathBuf};

/// Make a path absolute (relative to the working directory) and drop
/// `.`/`..` components. Symlinks are left alone.
pub fn normalize_path(p: &Path) -> std::io::Result<PathBuf> {
    let abs = if p.is_absolute() {
        p.to_path_buf()
    } else {
        std::env::current_dir()?.join(p)
    };

    Ok(lexical_normalize(&abs))
}

fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();

    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }

    out
}

/// The string form a path is interned under. Non-UTF-8 paths are refused
/// rather than interned lossily, which would alias distinct files.
pub fn path_key(p: &Path) -> Result<String> {
    p.to_str()
        .map(str::to_owned)
        .ok_or_else(|| anyhow!("path is not valid UTF-8: {}", p.display()))
}

pub fn normalized_key(p: &Path) -> Result<String> {
    let norm = normalize_path(p)
        .with_context(|| format!("Failed to normalize path: {}", p.display()))?;
    path_key(&norm)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dot_components_are_removed() {
        assert_eq!(
            lexical_normalize(Path::new("/a/./b/../c/d.rs")),
            PathBuf::from("/a/c/d.rs")
        );
    }

    #[test]
    fn relative_paths_become_absolute() {
        let key = normalized_key(Path::new("x/y.rs")).unwrap();
        assert!(key.starts_with('/'));
        assert!(key.ends_with("/x/y.rs"));
    }
}
