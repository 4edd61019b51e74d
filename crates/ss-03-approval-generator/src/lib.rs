//! # Hierarchical Approval Generator
//!
//! When a submitted proposal's Safe is owned by other monitored Safes, each
//! of those owners gets a child proposal calling `approveHash(parentHash)`
//! on the parent Safe. Children are proposals like any other, so they are
//! hashed, submitted and may spawn children of their own.
//!
//! ## Invariants
//!
//! | ID | Invariant | Enforcement |
//! |----|-----------|-------------|
//! | INVARIANT-1 | At most one child per (parent hash, owner position) | `EntityStore::child_proposal` lookup before create |
//! | INVARIANT-2 | Only Safe owners listing the parent's delegate get children | `ApprovalGenerator::prepare_child` skip rules |
//! | INVARIANT-3 | Recursion never revisits a Safe on the current path | `ApprovalPath::enter` |
//!
//! ## Module Structure
//!
//! ```text
//! ss-03-approval-generator/
//! ├── config.rs    # ApprovalConfig
//! ├── domain/      # ParentContext, outcomes, ApprovalPath, errors
//! ├── ports/       # CodeInspector (+ mocks)
//! └── service.rs   # ApprovalGenerator
//! ```

pub mod config;
pub mod domain;
pub mod ports;
pub mod service;

pub use config::ApprovalConfig;
pub use domain::{
    ApprovalError, ApprovalPath, ChildOutcome, InspectorError, ParentContext, PreparedChild,
    SkipReason,
};
pub use ports::outbound::mocks::MockCodeInspector;
pub use ports::CodeInspector;
pub use service::ApprovalGenerator;
