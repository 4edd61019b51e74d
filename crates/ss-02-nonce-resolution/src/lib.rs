//! # SS-02: Nonce Resolution
//!
//! Assigns execution order to proposals that have not been submitted yet.
//!
//! ## Counters
//!
//! Each Safe gets three counters, initialised lazily from its transaction
//! history the first time a run references it:
//!
//! | Counter | Initial value | Formula binding |
//! |---------|---------------|-----------------|
//! | `nonce` | highest executed nonce + 1, or 0 | `n`, `nonce` |
//! | `pendingNonce` | highest known nonce + 1, or 0 | `pn`, `pendingNonce` |
//! | `auto` | `nonce` | `a`, `auto` |
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Enforcement Location |
//! |----|-----------|---------------------|
//! | INVARIANT-1 | Per-Safe schedule strictly increasing | `domain/invariants.rs`, `application/service.rs` |
//! | INVARIANT-2 | Automatic nonces skip values claimed this run | `algorithms/assignment.rs` - `assign_auto()` |
//! | INVARIANT-3 | Two explicit nonces never share a value | `application/service.rs` - `schedule()` |
//! | INVARIANT-4 | Parents and children draw from the same counters | `application/service.rs` - `resolve_child()` |
//!
//! ## Module Structure
//!
//! ```text
//! ss-02-nonce-resolution/
//! ├── algorithms/   # formula parser, two-pass assignment
//! ├── application/  # NonceResolver
//! ├── adapters/     # TransactionHistory for EntityStore
//! ├── domain/       # counters, candidates, schedules, errors
//! └── ports/        # TransactionHistory
//! ```

pub mod adapters;
pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use algorithms::{Binding, Bindings, Expr};
pub use application::service::NonceResolver;
pub use config::NonceConfig;
pub use domain::entities::*;
pub use domain::errors::{ExpressionError, NonceError};
pub use ports::TransactionHistory;
