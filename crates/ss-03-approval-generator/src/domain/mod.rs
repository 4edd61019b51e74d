//! Domain module for the Approval Generator

pub mod entities;
pub mod errors;
pub mod path;

pub use entities::{ChildOutcome, ParentContext, PreparedChild, SkipReason};
pub use errors::{ApprovalError, InspectorError};
pub use path::ApprovalPath;
