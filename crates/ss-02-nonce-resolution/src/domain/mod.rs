//! Domain module for Nonce Resolution

pub mod entities;
pub mod errors;
pub mod invariants;

pub use entities::*;
pub use errors::{ExpressionError, NonceError};
