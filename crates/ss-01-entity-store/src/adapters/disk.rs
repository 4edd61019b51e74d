//! Filesystem backend rooted at the repository checkout.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::ports::{BackendError, EntityBackend};

pub struct DiskBackend {
    root: PathBuf,
}

impl DiskBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn walk(&self, dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), BackendError> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(BackendError::io(dir, e)),
        };

        for entry in entries {
            let entry = entry.map_err(|e| BackendError::io(dir, e))?;
            let path = entry.path();
            let file_type = entry.file_type().map_err(|e| BackendError::io(&path, e))?;
            if file_type.is_dir() {
                self.walk(&path, out)?;
            } else if file_type.is_file() {
                if let Ok(relative) = path.strip_prefix(&self.root) {
                    out.push(relative.to_path_buf());
                }
            }
        }
        Ok(())
    }
}

impl EntityBackend for DiskBackend {
    fn list(&self, dir: &Path) -> Result<Vec<PathBuf>, BackendError> {
        let mut out = Vec::new();
        self.walk(&self.root.join(dir), &mut out)?;
        out.sort();
        Ok(out)
    }

    fn read(&self, path: &Path) -> Result<Option<String>, BackendError> {
        match fs::read_to_string(self.root.join(path)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(BackendError::io(path, e)),
        }
    }

    /// Writes go through a sibling temp file and a rename, so a crash never
    /// leaves a half-written entity behind.
    fn write(&mut self, path: &Path, content: &str) -> Result<(), BackendError> {
        let full = self.root.join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).map_err(|e| BackendError::io(path, e))?;
        }
        let tmp = full.with_extension("json.tmp");
        fs::write(&tmp, content).map_err(|e| BackendError::io(path, e))?;
        fs::rename(&tmp, &full).map_err(|e| BackendError::io(path, e))?;
        debug!(path = %path.display(), "Wrote entity file");
        Ok(())
    }

    fn remove(&mut self, path: &Path) -> Result<(), BackendError> {
        fs::remove_file(self.root.join(path)).map_err(|e| BackendError::io(path, e))?;
        debug!(path = %path.display(), "Removed entity file");
        Ok(())
    }
}
