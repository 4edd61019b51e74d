//! # Shared Types Crate
//!
//! Entity records persisted in a Safe-Sync repository and shared by every
//! component crate.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: the four entity kinds (Safe, EOA, Transaction,
//!   Proposal) are defined once, here.
//! - **Sum types over optional fields**: a Safe is either bare or populated, a
//!   Proposal either calls a function or approves a parent hash.
//! - **Canonical hex**: addresses and hashes are `primitive-types` values whose
//!   serde form is lower-case `0x` hex, so string comparison is case-stable.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
