//! # SS-01: Entity Store
//!
//! In-memory, multiply-indexed view of every entity file in a Safe-Sync
//! repository, with a deferred commit phase.
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Enforcement Location |
//! |----|-----------|---------------------|
//! | INVARIANT-1 | Safe/EOA address and name unique across the store | `service.rs` - `check_safe_keys()` / `check_eoa_keys()` |
//! | INVARIANT-2 | safeTxHash unique per transactions and per proposals | `service.rs` - `check_transaction()` / `check_proposal()` |
//! | INVARIANT-3 | Transactions and proposals reference a known Safe | `service.rs` - `require_safe()` |
//! | INVARIANT-4 | One child proposal per (parent hash, owner position) | `service.rs` - `check_proposal()` |
//! | INVARIANT-5 | Old index entries removed before new ones inserted | `service.rs` - `write_*()` |
//! | INVARIANT-6 | Nothing touches storage before `save()` | `domain/staged.rs` |
//!
//! ## Commit Protocol
//!
//! ```text
//! load() ──→ create/write/unbind (memory only) ──→ stage() ──→ save()
//!                                                     │
//!                                                     └──→ diff()  (read-only)
//! ```
//!
//! ## Module Structure
//!
//! ```text
//! ss-01-entity-store/
//! ├── domain/     # StoreError, layout paths, slots, staged writes, line diff
//! ├── ports/      # EntityBackend
//! ├── adapters/   # DiskBackend, MemoryBackend
//! └── service.rs  # EntityStore
//! ```

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{DiskBackend, MemoryBackend};
pub use domain::{
    child_proposal_path, line_diff, safe_path, transaction_path, ChangeKind, DiffLine,
    Entry, SaveSummary, StagedChange, StagedWrites, StoreError, EOAS_DIR, PROPOSALS_DIR,
    SAFES_DIR, TRANSACTIONS_DIR,
};
pub use ports::{BackendError, EntityBackend};
pub use service::{EntityStore, LoadSummary};
