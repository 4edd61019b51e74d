//! `TransactionHistory` over the entity store.

use shared_types::Address;
use ss_01_entity_store::EntityStore;

use crate::ports::TransactionHistory;

impl TransactionHistory for EntityStore {
    fn highest_nonce(&self, safe: &Address) -> Option<u64> {
        EntityStore::highest_nonce(self, safe)
    }

    fn highest_executed_nonce(&self, safe: &Address) -> Option<u64> {
        EntityStore::highest_executed_nonce(self, safe)
    }
}
