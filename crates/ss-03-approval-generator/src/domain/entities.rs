//! Core domain entities for the Approval Generator

use std::path::PathBuf;

use shared_types::{Address, Hash, Proposal};

/// A submitted proposal whose owners are being asked to approve it.
///
/// Owned copies, so the store can be mutated while children are prepared.
#[derive(Debug, Clone)]
pub struct ParentContext {
    pub path: PathBuf,
    pub proposal: Proposal,
    pub safe: Address,
    pub safe_name: String,
    pub owners: Vec<Address>,
    pub safe_tx_hash: Hash,
}

/// Why an owner gets no child proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The owner has no contract code.
    ExternallyOwned,
    /// The owner is a contract but not a Safe in the repository.
    Unmonitored,
    /// The owner Safe does not list the parent's delegate.
    DelegateNotRegistered,
}

/// A child proposal written to the store and given a nonce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedChild {
    /// Proposal slot in the entity store.
    pub index: usize,
    pub path: PathBuf,
    pub safe: Address,
    pub nonce: u64,
    /// False when an existing child file was updated in place.
    pub created: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChildOutcome {
    Prepared(PreparedChild),
    Skipped(SkipReason),
}
