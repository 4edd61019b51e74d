//! # Safe-Sync Test Suite
//!
//! Cross-crate scenarios that drive a full sync run through the runtime
//! with in-memory collaborators.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs      # Repository files, canned service state, runner builder
//! └── integration/
//!     ├── scenarios.rs # Nonce assignment, approval children, hash verification
//!     └── disk.rs      # Full runs against a repository on disk
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p ss-tests
//! cargo test -p ss-tests integration::scenarios::
//!
//! # Benchmarks
//! cargo bench -p ss-tests
//! ```

#[cfg(test)]
pub mod fixtures;
pub mod integration;
