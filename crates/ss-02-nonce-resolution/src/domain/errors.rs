//! Error types for Nonce Resolution

use shared_types::Address;
use thiserror::Error;

/// A formula that failed to parse or evaluate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpressionError {
    #[error("unexpected character '{found}' at offset {offset}")]
    UnexpectedChar { offset: usize, found: char },

    #[error("unexpected '{found}' at offset {offset}")]
    UnexpectedToken { offset: usize, found: String },

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("unknown binding '{0}' (expected a, auto, n, nonce, pn or pendingNonce)")]
    UnknownBinding(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("arithmetic overflow")]
    Overflow,

    #[error("negative nonce {0}")]
    Negative(i128),

    #[error("expression is {len} bytes, limit is {max}")]
    TooLong { len: usize, max: usize },

    #[error("expression nests deeper than {max}")]
    TooDeep { max: usize },
}

/// All errors that can occur during nonce resolution.
///
/// Every variant is fatal. Expression and duplicate errors name the
/// offending proposal.
#[derive(Debug, Error)]
pub enum NonceError {
    #[error("Invalid nonce '{expression}' in {proposal}: {source}")]
    InvalidExpression {
        proposal: String,
        expression: String,
        #[source]
        source: ExpressionError,
    },

    #[error("Nonce {nonce} for Safe {safe:#x} claimed by both {first} and {second}")]
    DuplicateNonce {
        safe: Address,
        nonce: u64,
        first: String,
        second: String,
    },

    #[error("Nonce counter of Safe {safe:#x} would pass the largest nonce")]
    Exhausted { safe: Address },
}
