//! # Safe-Sync Runtime
//!
//! Wires the four core crates to their external collaborators and runs
//! one reconciliation of a Safe-Sync repository.
//!
//! ## Run Sequence
//!
//! 1. Load every entity file into the entity store
//! 2. Refresh each Safe from the transaction service (owners, delegates,
//!    threshold, nonce, version, transactions)
//! 3. Schedule nonces for every unsubmitted proposal
//! 4. Per Safe, in nonce order: simulate, estimate, verify the hash, generate
//!    and sync approval children depth-first, then sign, propose, notify
//! 5. Commit all changes at once (or print the diff in dry-run mode)
//! 6. Write one manifest per processed proposal
//!
//! ## Failure Classes
//!
//! | Class | Examples | Effect |
//! |-------|----------|--------|
//! | Integrity | duplicate name, unknown Safe | run aborts, nothing committed |
//! | Nonce | bad formula, duplicate explicit nonce | run aborts, nothing committed |
//! | Verification | safeTxHash mismatch | run aborts, nothing signed |
//! | Authorization | delegate not registered, no key | run aborts at submission |
//! | Upstream | simulation, estimation, propose | manifest error, run continues |
//!
//! ## Module Structure
//!
//! ```text
//! sync-runtime/
//! ├── adapters/   # HTTP service, JSON-RPC, simulator, signer, notifier
//! ├── container/  # SyncConfig, Collaborators
//! ├── domain/     # service records, simulation, manifests
//! ├── ports/      # TransactionService, Simulator, DelegateSigner, Notifier (+ mocks)
//! ├── sync/       # Safe sync, proposal sync, SyncRunner
//! └── errors.rs   # SyncError and collaborator errors
//! ```

pub mod adapters;
pub mod container;
pub mod domain;
pub mod errors;
pub mod ports;
pub mod sync;

pub use container::{Collaborators, ConfigError, SyncConfig};
pub use errors::SyncError;
pub use sync::{RunReport, SyncRunner};
