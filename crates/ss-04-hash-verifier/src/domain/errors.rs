//! Error types for the Hash Verifier

use shared_types::{Address, Hash};
use thiserror::Error;

/// Failure of the deployed contract view call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractError {
    #[error("RPC call failed: {0}")]
    Rpc(String),

    #[error("Malformed return data: {0}")]
    MalformedReturn(String),
}

/// All errors that can occur during hash verification.
///
/// Every variant is fatal: nothing may be signed after any of them.
#[derive(Debug, Error)]
pub enum VerificationError {
    /// The locally computed safeTxHash disagrees with the contract.
    #[error(
        "safeTxHash mismatch for Safe {safe:#x} nonce {nonce}: computed {computed:#x}, on-chain {on_chain:#x}"
    )]
    HashMismatch {
        safe: Address,
        nonce: u64,
        computed: Hash,
        on_chain: Hash,
    },

    #[error("Safe {safe:#x} reports unparseable version '{version}'")]
    InvalidVersion { safe: Address, version: String },

    #[error("getTransactionHash on {safe:#x} failed: {source}")]
    Contract {
        safe: Address,
        #[source]
        source: ContractError,
    },
}
