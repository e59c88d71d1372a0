//! File store adapter: maps opaque file references to paths on disk and
//! persists operation outputs as new references.

pub mod filesystem;

use std::path::PathBuf;

use crate::error::StorageError;

pub use filesystem::FileStorage;

/// Area a stored file lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Served under `/files/`.
    Public,
    /// Served under `/private/files/`.
    Private,
}

pub trait FileStore: Send + Sync {
    /// Resolves a file reference to an existing absolute path.
    fn resolve(&self, file_ref: &str) -> Result<PathBuf, StorageError>;

    /// Persists `content` under `filename` and returns the new file reference.
    fn store(
        &self,
        content: &[u8],
        filename: &str,
        visibility: Visibility,
    ) -> Result<String, StorageError>;

    fn read(&self, file_ref: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.resolve(file_ref)?;
        std::fs::read(&path).map_err(|e| StorageError::ReadFile { path, source: e })
    }
}
