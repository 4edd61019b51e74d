//! Configuration for the Approval Generator

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApprovalConfig {
    /// Longest ownership chain followed before giving up.
    pub max_depth: usize,
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self { max_depth: 16 }
    }
}
