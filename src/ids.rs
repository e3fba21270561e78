use crate::error::CodecError;
use std::cmp::Ordering;
use std::fmt;

const INVALID: i32 = -1;

/// Id of an interned directory path.
///
/// Default-constructed values are the invalid sentinel (`-1`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DirectoryPathId(i32);

impl DirectoryPathId {
    pub const fn new(id: i32) -> Self {
        Self(id)
    }

    pub const fn id(self) -> i32 {
        self.0
    }

    pub const fn is_valid(self) -> bool {
        self.0 >= 0
    }

    /// Stable on-disk form: `i32` little-endian.
    pub fn to_bytes(self) -> [u8; 4] {
        self.0.to_le_bytes()
    }

    /// Negative values decode to the invalid sentinel.
    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        Self(normalize(i32::from_le_bytes(bytes)))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let arr: [u8; 4] = bytes.try_into().map_err(|_| CodecError::Length {
            expected: 4,
            actual: bytes.len(),
        })?;
        Ok(Self::from_bytes(arr))
    }
}

impl Default for DirectoryPathId {
    fn default() -> Self {
        Self(INVALID)
    }
}

impl fmt::Display for DirectoryPathId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Id of an interned file path: the directory id plus the id of the leaf
/// name within the (global) file name table.
///
/// Equality only holds between valid ids, so this type is `PartialEq` but
/// deliberately not `Eq`.
#[derive(Debug, Clone, Copy)]
pub struct FilePathId {
    pub directory_id: i32,
    pub name_id: i32,
}

impl FilePathId {
    pub const fn new(directory_id: i32, name_id: i32) -> Self {
        Self {
            directory_id,
            name_id,
        }
    }

    pub const fn is_valid(self) -> bool {
        self.directory_id >= 0 && self.name_id >= 0
    }

    pub const fn directory_path_id(self) -> DirectoryPathId {
        DirectoryPathId(self.directory_id)
    }

    /// Stable on-disk form:
    /// [0..4] i32 directory_id LE
    /// [4..8] i32 name_id LE
    pub fn to_bytes(self) -> [u8; 8] {
        let mut out = [0u8; 8];
        out[..4].copy_from_slice(&self.directory_id.to_le_bytes());
        out[4..].copy_from_slice(&self.name_id.to_le_bytes());
        out
    }

    /// A negative component anywhere yields the invalid id.
    pub fn from_bytes(bytes: [u8; 8]) -> Self {
        let mut dir = [0u8; 4];
        dir.copy_from_slice(&bytes[..4]);
        let mut name = [0u8; 4];
        name.copy_from_slice(&bytes[4..]);

        let id = Self::new(i32::from_le_bytes(dir), i32::from_le_bytes(name));
        if id.is_valid() { id } else { Self::default() }
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let arr: [u8; 8] = bytes.try_into().map_err(|_| CodecError::Length {
            expected: 8,
            actual: bytes.len(),
        })?;
        Ok(Self::from_bytes(arr))
    }
}

impl Default for FilePathId {
    fn default() -> Self {
        Self::new(INVALID, INVALID)
    }
}

impl PartialEq for FilePathId {
    fn eq(&self, other: &Self) -> bool {
        self.is_valid()
            && other.is_valid()
            && self.directory_id == other.directory_id
            && self.name_id == other.name_id
    }
}

// Invalid ids are unordered, matching `eq`.
impl PartialOrd for FilePathId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if !self.is_valid() || !other.is_valid() {
            return None;
        }
        Some((self.directory_id, self.name_id).cmp(&(other.directory_id, other.name_id)))
    }
}

impl fmt::Display for FilePathId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.directory_id, self.name_id)
    }
}

fn normalize(v: i32) -> i32 {
    if v < 0 { INVALID } else { v }
}
