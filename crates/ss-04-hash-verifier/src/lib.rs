//! # SS-04: Transaction Hash Verifier
//!
//! Computes the EIP-712 safeTxHash of a constructed Safe transaction and
//! cross-checks it against the deployed contract's `getTransactionHash`.
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Enforcement Location |
//! |----|-----------|---------------------|
//! | INVARIANT-1 | Nothing is signed unless local and on-chain hashes agree | `service.rs` - `verify()` |
//! | INVARIANT-2 | Hashing is a pure function of domain and parameters | `domain/eip712.rs` |
//! | INVARIANT-3 | Domain and type strings follow the Safe's release | `domain/eip712.rs` - `SafeDomain` |
//!
//! ## Module Structure
//!
//! ```text
//! ss-04-hash-verifier/
//! ├── domain/
//! │   ├── abi.rs      # Safe calldata via sol!, words, MultiSend packing
//! │   ├── eip712.rs   # domain separator, SafeTx hashing
//! │   ├── entities.rs # SafeTxData, PlannedCall, VerifiedHash
//! │   └── errors.rs   # VerificationError, ContractError
//! ├── ports/          # SafeContract (+ mocks)
//! └── service.rs      # TransactionHashVerifier
//! ```

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::abi;
pub use domain::eip712;
pub use domain::{ContractError, PlannedCall, SafeTxData, VerificationError, VerifiedHash};
pub use ports::outbound::mocks::MockSafeContract;
pub use ports::SafeContract;
pub use service::TransactionHashVerifier;
