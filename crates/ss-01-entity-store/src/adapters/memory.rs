//! In-memory backend.
//!
//! Clones share the same file map, so a test can keep a handle and inspect
//! what the store committed.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::ports::{BackendError, EntityBackend};

#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    files: Arc<RwLock<BTreeMap<PathBuf, String>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with `(path, content)` pairs.
    pub fn with_files<P: Into<PathBuf>>(files: impl IntoIterator<Item = (P, String)>) -> Self {
        let backend = Self::new();
        {
            let mut map = backend.files.write();
            for (path, content) in files {
                map.insert(path.into(), content);
            }
        }
        backend
    }

    pub fn get(&self, path: impl AsRef<Path>) -> Option<String> {
        self.files.read().get(path.as_ref()).cloned()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.read().keys().cloned().collect()
    }
}

impl EntityBackend for MemoryBackend {
    fn list(&self, dir: &Path) -> Result<Vec<PathBuf>, BackendError> {
        Ok(self
            .files
            .read()
            .keys()
            .filter(|p| p.starts_with(dir))
            .cloned()
            .collect())
    }

    fn read(&self, path: &Path) -> Result<Option<String>, BackendError> {
        Ok(self.files.read().get(path).cloned())
    }

    fn write(&mut self, path: &Path, content: &str) -> Result<(), BackendError> {
        self.files
            .write()
            .insert(path.to_path_buf(), content.to_string());
        Ok(())
    }

    fn remove(&mut self, path: &Path) -> Result<(), BackendError> {
        match self.files.write().remove(path) {
            Some(_) => Ok(()),
            None => Err(BackendError::io(path, "no such file")),
        }
    }
}
