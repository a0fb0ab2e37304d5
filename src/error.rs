//! Storage Error Types

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Updates root exists but is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Integrity mismatch: expected {expected}, got {actual}")]
    IntegrityMismatch { expected: String, actual: String },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Disk full while writing {0}")]
    DiskFull(PathBuf),

    #[error("Asset {0} referenced by record but never persisted")]
    AssetNotPersisted(String),
}

impl StorageError {
    /// Wrap an IO error, promoting out-of-space conditions to `DiskFull`.
    pub(crate) fn from_io(err: io::Error, path: &std::path::Path) -> Self {
        if err.kind() == io::ErrorKind::StorageFull {
            Self::DiskFull(path.to_path_buf())
        } else {
            Self::Io(err)
        }
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;
