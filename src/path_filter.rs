use crate::path_utils;
use anyhow::Result;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct PathFilter {
    prefixes: Vec<String>,
}

impl PathFilter {
    /// If `paths` is empty => matches everything.
    pub fn new(paths: &[PathBuf]) -> Result<Self> {
        let mut prefixes = paths
            .iter()
            .map(|p| {
                let mut s = path_utils::normalized_key(p)?;
                if s.len() > 1 && s.ends_with('/') {
                    s.pop();
                }
                Ok(s)
            })
            .collect::<Result<Vec<_>>>()?;

        prefixes.sort_by(|a, b| b.len().cmp(&a.len()));
        Ok(Self { prefixes })
    }

    /// True if no prefixes were given, or `path` equals a prefix or lies
    /// under one (boundary-aware).
    pub fn matches(&self, path: &str) -> bool {
        self.prefixes.is_empty() || self.prefixes.iter().any(|p| starts_with_path_prefix(path, p))
    }
}

/// "/home/a" matches "/home/a/file" but not "/home/ab/file".
fn starts_with_path_prefix(path: &str, prefix: &str) -> bool {
    if path == prefix {
        return true;
    }
    if prefix == "/" {
        return path.starts_with('/');
    }
    path.starts_with(prefix) && path.as_bytes().get(prefix.len()) == Some(&b'/')
}
