//! Outbound Ports (Driven Ports)

use shared_types::Address;

/// Read access to a Safe's recorded transactions.
///
/// Production: the entity store (adapters/store.rs).
pub trait TransactionHistory {
    /// Highest nonce among all known transactions of `safe`.
    fn highest_nonce(&self, safe: &Address) -> Option<u64>;

    /// Highest nonce among executed transactions of `safe`.
    fn highest_executed_nonce(&self, safe: &Address) -> Option<u64>;
}
