//! Ports for the Entity Store

pub mod outbound;

pub use outbound::{BackendError, EntityBackend};
