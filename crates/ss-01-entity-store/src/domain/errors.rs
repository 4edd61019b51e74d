//! Error types for the Entity Store

use std::path::PathBuf;

use shared_types::{Address, EntityKind};
use thiserror::Error;

use crate::ports::BackendError;

/// All errors that can occur in the entity store.
///
/// Every variant except `Backend` is an integrity error: the repository is in a
/// state the run must not continue from.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint would be violated.
    #[error("Duplicate {kind} {field}: {value}")]
    DuplicateEntity {
        kind: EntityKind,
        field: &'static str,
        value: String,
    },

    /// A transaction or proposal names a Safe that is not in the store.
    #[error("{kind} at {} references unknown Safe {safe:#x}", .path.display())]
    UnknownSafe {
        kind: EntityKind,
        path: PathBuf,
        safe: Address,
    },

    /// Slot index does not exist.
    #[error("{kind} index {index} out of bounds (len {len})")]
    IndexOutOfBounds {
        kind: EntityKind,
        index: usize,
        len: usize,
    },

    /// An entity file could not be parsed.
    #[error("Failed to decode {}: {message}", .path.display())]
    Decode { path: PathBuf, message: String },

    /// An entity could not be serialized.
    #[error("Failed to encode {}: {message}", .path.display())]
    Encode { path: PathBuf, message: String },

    /// Storage backend failure.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}
