//! Configuration for Nonce Resolution

use serde::{Deserialize, Serialize};

/// Limits applied to nonce formulas.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NonceConfig {
    /// Longest formula accepted, in bytes.
    pub max_expression_length: usize,
    /// Deepest parenthesis / unary nesting accepted.
    pub max_expression_depth: usize,
}

impl Default for NonceConfig {
    fn default() -> Self {
        Self {
            max_expression_length: 256,
            max_expression_depth: 32,
        }
    }
}
