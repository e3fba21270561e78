use crate::ids::DirectoryPathId;
use crate::interner::UnknownId;
use std::io;
use thiserror::Error;

/// Errors raised by a [`PathStore`](crate::store::PathStore).
#[derive(Debug, Error)]
pub enum StoreError {
    /// Lock contention inside the store. Retried.
    #[error("path store is busy")]
    Busy,

    /// A concurrent writer inserted the same row first. Retried.
    #[error("unique constraint violated by a concurrent writer")]
    UniqueConstraintViolated,

    #[error("directory path id {0} does not exist")]
    DirectoryPathIdDoesNotExist(DirectoryPathId),

    #[error("source name id {0} does not exist")]
    SourceNameIdDoesNotExist(i32),

    /// The id counter behind `{0}` reached `i32::MAX`.
    #[error("no ids left for {0}")]
    IdSpaceExhausted(&'static str),

    #[error("database error: {0}")]
    Backend(#[from] redb::Error),

    #[error("I/O error: {0}")]
    Io(#[source] io::Error),
}

impl StoreError {
    /// Transient errors are absorbed by [`with_retry`](crate::retry::with_retry).
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Busy | StoreError::UniqueConstraintViolated)
    }
}

impl From<redb::StorageError> for StoreError {
    fn from(e: redb::StorageError) -> Self {
        match e {
            redb::StorageError::Io(io) if is_transient_io(&io) => StoreError::Busy,
            other => StoreError::Backend(other.into()),
        }
    }
}

impl From<redb::TransactionError> for StoreError {
    fn from(e: redb::TransactionError) -> Self {
        match e {
            redb::TransactionError::Storage(s) => s.into(),
            other => StoreError::Backend(other.into()),
        }
    }
}

impl From<redb::TableError> for StoreError {
    fn from(e: redb::TableError) -> Self {
        match e {
            redb::TableError::Storage(s) => s.into(),
            other => StoreError::Backend(other.into()),
        }
    }
}

impl From<redb::CommitError> for StoreError {
    fn from(e: redb::CommitError) -> Self {
        match e {
            redb::CommitError::Storage(s) => s.into(),
            other => StoreError::Backend(other.into()),
        }
    }
}

impl From<redb::DatabaseError> for StoreError {
    fn from(e: redb::DatabaseError) -> Self {
        match e {
            redb::DatabaseError::Storage(s) => s.into(),
            other => StoreError::Backend(other.into()),
        }
    }
}

impl From<io::Error> for StoreError {
    fn from(e: io::Error) -> Self {
        if is_transient_io(&e) {
            StoreError::Busy
        } else {
            StoreError::Io(e)
        }
    }
}

fn is_transient_io(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted)
}

/// Errors crossing the [`FilePathCache`](crate::file_path_cache::FilePathCache) boundary.
#[derive(Debug, Error)]
pub enum PathCacheError {
    /// The caller asked for the path of a structurally invalid id.
    #[error("invalid path id")]
    InvalidId,

    /// A bare name has no directory to intern it under.
    #[error("path has no directory component: {0:?}")]
    NoDirectory(String),

    #[error("unknown id {0}")]
    UnknownId(i32),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<UnknownId> for PathCacheError {
    fn from(e: UnknownId) -> Self {
        PathCacheError::UnknownId(e.0)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("expected {expected} bytes, got {actual}")]
    Length { expected: usize, actual: usize },
}

pub type Result<T, E = PathCacheError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_busy_and_unique_violations_are_transient() {
        assert!(StoreError::Busy.is_transient());
        assert!(StoreError::UniqueConstraintViolated.is_transient());
        assert!(!StoreError::SourceNameIdDoesNotExist(3).is_transient());
        assert!(!StoreError::DirectoryPathIdDoesNotExist(DirectoryPathId::new(1)).is_transient());
        assert!(!StoreError::Io(io::Error::other("disk on fire")).is_transient());
        assert!(!StoreError::IdSpaceExhausted("directories").is_transient());
    }

    #[test]
    fn interner_misses_keep_their_id() {
        let e = PathCacheError::from(UnknownId(-4));
        assert!(matches!(e, PathCacheError::UnknownId(-4)));
        assert_eq!(e.to_string(), "unknown id -4");
    }

    #[test]
    fn interrupted_io_maps_to_busy() {
        let e: StoreError = io::Error::from(io::ErrorKind::WouldBlock).into();
        assert!(matches!(e, StoreError::Busy));

        let e: StoreError = redb::StorageError::Io(io::Error::from(io::ErrorKind::Interrupted)).into();
        assert!(matches!(e, StoreError::Busy));

        let e: StoreError = io::Error::from(io::ErrorKind::PermissionDenied).into();
        assert!(matches!(e, StoreError::Io(_)));
    }
}
