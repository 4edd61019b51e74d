//! Domain module for the Entity Store
//!
//! Contains errors, the persistence layout, slots, staged writes and diffing.

pub mod diff;
pub mod errors;
pub mod paths;
pub mod slots;
pub mod staged;

pub use diff::{line_diff, render_diff, DiffLine};
pub use errors::StoreError;
pub use paths::*;
pub use slots::{Entry, Slot};
pub use staged::{ChangeKind, SaveSummary, StagedChange, StagedWrites};
