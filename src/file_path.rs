pub const SEPARATOR: char = '/';

/// A path split at its last separator into directory and leaf name.
///
/// A path without separator has an empty directory, the whole string as
/// name and no split index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilePathView<'a> {
    path: &'a str,
    separator_index: Option<usize>,
}

impl<'a> FilePathView<'a> {
    pub fn new(path: &'a str) -> Self {
        Self {
            path,
            separator_index: path.rfind(SEPARATOR),
        }
    }

    pub fn path(&self) -> &'a str {
        self.path
    }

    pub fn separator_index(&self) -> Option<usize> {
        self.separator_index
    }

    /// False for a bare name. `"/c.cpp"` has the empty directory; `"c.cpp"`
    /// has none.
    pub fn has_directory(&self) -> bool {
        self.separator_index.is_some()
    }

    pub fn directory(&self) -> &'a str {
        match self.separator_index {
            Some(i) => &self.path[..i],
            None => "",
        }
    }

    pub fn name(&self) -> &'a str {
        match self.separator_index {
            Some(i) => &self.path[i + 1..],
            None => self.path,
        }
    }
}

pub fn join(directory: &str, name: &str) -> String {
    let mut out = String::with_capacity(directory.len() + 1 + name.len());
    out.push_str(directory);
    out.push(SEPARATOR);
    out.push_str(name);
    out
}
