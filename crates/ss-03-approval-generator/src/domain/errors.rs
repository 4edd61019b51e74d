//! Error types for the Approval Generator

use shared_types::Address;
use ss_01_entity_store::StoreError;
use ss_02_nonce_resolution::NonceError;
use thiserror::Error;

/// Failure to read an account's code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("code lookup for {address:#x} failed: {message}")]
pub struct InspectorError {
    pub address: Address,
    pub message: String,
}

fn render_path(path: &[Address]) -> String {
    path.iter()
        .map(|a| format!("{a:#x}"))
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// All errors that can occur while generating approvals.
#[derive(Debug, Error)]
pub enum ApprovalError {
    /// A Safe owns itself through the chain listed.
    #[error("Ownership cycle: {}", render_path(.path))]
    OwnershipCycle { path: Vec<Address> },

    #[error("Ownership chain deeper than {max}: {}", render_path(.path))]
    TooDeep { max: usize, path: Vec<Address> },

    #[error(transparent)]
    Inspector(#[from] InspectorError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Nonce(#[from] NonceError),
}
