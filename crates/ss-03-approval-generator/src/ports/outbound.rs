//! # Outbound Ports (Driven Ports)
//!
//! Production: `eth_getCode` through the runtime's JSON-RPC client.
//! Testing: `mocks::MockCodeInspector`.

use std::sync::Arc;

use async_trait::async_trait;
use shared_types::Address;

use crate::domain::InspectorError;

/// Distinguishes contracts from externally-owned accounts.
#[async_trait]
pub trait CodeInspector: Send + Sync {
    async fn has_code(&self, address: Address) -> Result<bool, InspectorError>;
}

#[async_trait]
impl<T: CodeInspector + ?Sized> CodeInspector for Arc<T> {
    async fn has_code(&self, address: Address) -> Result<bool, InspectorError> {
        (**self).has_code(address).await
    }
}

/// In-memory implementations for tests and offline runs.
pub mod mocks {
    use std::collections::HashSet;

    use super::*;

    /// Treats exactly the listed addresses as contracts.
    #[derive(Debug, Clone, Default)]
    pub struct MockCodeInspector {
        pub contracts: HashSet<Address>,
    }

    impl MockCodeInspector {
        pub fn with_contracts(contracts: impl IntoIterator<Item = Address>) -> Self {
            Self {
                contracts: contracts.into_iter().collect(),
            }
        }
    }

    #[async_trait]
    impl CodeInspector for MockCodeInspector {
        async fn has_code(&self, address: Address) -> Result<bool, InspectorError> {
            Ok(self.contracts.contains(&address))
        }
    }
}
