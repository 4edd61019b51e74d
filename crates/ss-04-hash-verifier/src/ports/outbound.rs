//! # Outbound Ports (Driven Ports)
//!
//! Production: the JSON-RPC adapter in the runtime issues an `eth_call`.
//! Testing: `mocks::MockSafeContract`.

use std::sync::Arc;

use async_trait::async_trait;
use shared_types::{Address, Hash};

use crate::domain::{ContractError, SafeTxData};

/// View access to a deployed Safe.
#[async_trait]
pub trait SafeContract: Send + Sync {
    /// The Safe's own `getTransactionHash` for these parameters.
    async fn get_transaction_hash(
        &self,
        safe: Address,
        tx: &SafeTxData,
    ) -> Result<Hash, ContractError>;
}

#[async_trait]
impl<T: SafeContract + ?Sized> SafeContract for Arc<T> {
    async fn get_transaction_hash(
        &self,
        safe: Address,
        tx: &SafeTxData,
    ) -> Result<Hash, ContractError> {
        (**self).get_transaction_hash(safe, tx).await
    }
}

/// In-memory implementations for tests and offline runs.
pub mod mocks {
    use std::collections::HashMap;

    use super::*;
    use crate::domain::eip712::{safe_tx_hash, SafeDomain, DEFAULT_VERSION};

    /// A contract that hashes like a real Safe, optionally pinned to a fixed
    /// answer.
    #[derive(Debug, Clone, Default)]
    pub struct MockSafeContract {
        pub chain_id: u64,
        /// Deployed version per Safe; unknown Safes use the default release.
        pub versions: HashMap<Address, String>,
        /// Answer returned regardless of input.
        pub fixed: Option<Hash>,
        pub fail: bool,
    }

    impl MockSafeContract {
        pub fn new(chain_id: u64) -> Self {
            Self {
                chain_id,
                ..Self::default()
            }
        }

        pub fn with_version(mut self, safe: Address, version: impl Into<String>) -> Self {
            self.versions.insert(safe, version.into());
            self
        }

        pub fn returning(mut self, hash: Hash) -> Self {
            self.fixed = Some(hash);
            self
        }

        pub fn failing(mut self) -> Self {
            self.fail = true;
            self
        }
    }

    #[async_trait]
    impl SafeContract for MockSafeContract {
        async fn get_transaction_hash(
            &self,
            safe: Address,
            tx: &SafeTxData,
        ) -> Result<Hash, ContractError> {
            if self.fail {
                return Err(ContractError::Rpc("mock contract unavailable".to_string()));
            }
            if let Some(hash) = self.fixed {
                return Ok(hash);
            }
            let domain = match self.versions.get(&safe) {
                Some(version) => SafeDomain::new(self.chain_id, safe, Some(version))
                    .map_err(|e| ContractError::Rpc(e.to_string()))?,
                None => SafeDomain {
                    chain_id: self.chain_id,
                    safe,
                    version: DEFAULT_VERSION,
                },
            };
            Ok(safe_tx_hash(&domain, tx))
        }
    }
}
