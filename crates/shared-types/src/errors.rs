//! # Error Types
//!
//! Errors raised while interpreting entity fields.

use thiserror::Error;

/// Errors raised by entity field parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    /// Safe version string is not `major.minor.patch[+suffix]`.
    #[error("Invalid Safe version: {0:?}")]
    InvalidVersion(String),

    /// Hex payload could not be decoded.
    #[error("Invalid hex payload: {0}")]
    InvalidHex(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TypeError::InvalidVersion("v1".to_string());
        assert_eq!(err.to_string(), "Invalid Safe version: \"v1\"");
    }
}
