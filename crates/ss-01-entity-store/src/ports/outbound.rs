//! # Outbound Ports (Driven Ports)
//!
//! Storage the entity store persists into.
//!
//! Production: `DiskBackend` (adapters/disk.rs)
//! Testing and dry runs: `MemoryBackend` (adapters/memory.rs)

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::domain::StagedWrites;

/// Storage failure.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    #[error("I/O error on {}: {message}", .path.display())]
    Io { path: PathBuf, message: String },
}

impl BackendError {
    pub fn io(path: &Path, err: impl std::fmt::Display) -> Self {
        BackendError::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }
}

/// Abstract interface over the repository's files.
///
/// All paths are relative to the repository root.
pub trait EntityBackend: Send + Sync {
    /// Every file below `dir`, recursively, in sorted order.
    /// A missing directory lists as empty.
    fn list(&self, dir: &Path) -> Result<Vec<PathBuf>, BackendError>;

    /// File content, or `None` if the file does not exist.
    fn read(&self, path: &Path) -> Result<Option<String>, BackendError>;

    /// Create or replace a file, creating parent directories as needed.
    fn write(&mut self, path: &Path, content: &str) -> Result<(), BackendError>;

    /// Remove a file.
    fn remove(&mut self, path: &Path) -> Result<(), BackendError>;

    fn exists(&self, path: &Path) -> Result<bool, BackendError> {
        Ok(self.read(path)?.is_some())
    }

    /// Apply a staged commit.
    fn apply(&mut self, staged: &StagedWrites) -> Result<(), BackendError> {
        for (path, change) in staged.iter() {
            match &change.next {
                Some(content) => self.write(path, content)?,
                None => self.remove(path)?,
            }
        }
        Ok(())
    }
}
