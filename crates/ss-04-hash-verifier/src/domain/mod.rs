//! Domain module for the Hash Verifier
//!
//! Contains ABI encoding, EIP-712 hashing, entities and errors.

pub mod abi;
pub mod eip712;
pub mod entities;
pub mod errors;

pub use entities::{PlannedCall, SafeTxData, VerifiedHash};
pub use errors::{ContractError, VerificationError};
