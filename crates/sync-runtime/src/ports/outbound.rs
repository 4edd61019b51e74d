//! # Outbound Ports (Driven Ports)
//!
//! The external collaborators of a sync run.
//!
//! Production: `adapters::{HttpTransactionService, CommandSimulator,
//! LocalKeySigner, WebhookNotifier}`.
//! Testing: the in-memory implementations in `mocks`.

use async_trait::async_trait;
use shared_types::{Address, Bytes, Hash, U256};
use ss_04_hash_verifier::SafeTxData;

use crate::domain::{
    DelegateRecord, Page, PageRequest, ProposedTransaction, SafeInfo, ServiceTransaction,
    SimulationOutput, SimulationRequest,
};
use crate::errors::{NotifyError, ServiceError, SignerError, SimulationError};

/// The remote transaction service.
#[async_trait]
pub trait TransactionService: Send + Sync {
    async fn safe_info(&self, safe: Address) -> Result<SafeInfo, ServiceError>;

    async fn delegates(
        &self,
        safe: Address,
        page: PageRequest,
    ) -> Result<Page<DelegateRecord>, ServiceError>;

    async fn multisig_transactions(
        &self,
        safe: Address,
        page: PageRequest,
    ) -> Result<Page<ServiceTransaction>, ServiceError>;

    /// Suggested `safeTxGas` for `tx`.
    async fn estimate(&self, safe: Address, tx: &SafeTxData) -> Result<U256, ServiceError>;

    async fn propose(&self, proposal: &ProposedTransaction) -> Result<(), ServiceError>;
}

/// Turns a function call into the list of transactions it would broadcast.
#[async_trait]
pub trait Simulator: Send + Sync {
    async fn simulate(&self, request: &SimulationRequest) -> Result<SimulationOutput, SimulationError>;
}

/// Signs a safeTxHash on behalf of a proposal delegate.
pub trait DelegateSigner: Send + Sync {
    fn address(&self) -> Address;

    /// 65-byte `r ‖ s ‖ v` signature of the raw hash, `v` in {27, 28}.
    fn sign_hash(&self, hash: &Hash) -> Result<Bytes, SignerError>;
}

/// Posts or updates a message about a proposal.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Returns the message id to store for the next update.
    async fn notify(
        &self,
        channel: &str,
        body: &str,
        previous: Option<&str>,
    ) -> Result<String, NotifyError>;
}

/// In-memory implementations for tests and offline runs.
pub mod mocks {
    use std::collections::HashMap;
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;
    use crate::domain::SimulatedCall;

    fn page_of<T: Clone>(items: &[T], page: PageRequest) -> Page<T> {
        let results: Vec<T> = items.iter().skip(page.offset).take(page.limit).cloned().collect();
        let next = (page.offset + results.len() < items.len()).then(|| format!("offset={}", page.offset + results.len()));
        Page { next, results }
    }

    /// Serves canned Safe state and records proposals.
    #[derive(Clone, Default)]
    pub struct MockTransactionService {
        pub infos: HashMap<Address, SafeInfo>,
        pub delegates: HashMap<Address, Vec<DelegateRecord>>,
        pub transactions: HashMap<Address, Vec<ServiceTransaction>>,
        pub safe_tx_gas: U256,
        /// Safes whose retrieval calls fail.
        pub unreachable: Vec<Address>,
        pub fail_estimation: bool,
        pub fail_propose: bool,
        pub page_limit: Option<usize>,
        pub proposed: Arc<Mutex<Vec<ProposedTransaction>>>,
    }

    impl MockTransactionService {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_safe(mut self, info: SafeInfo, delegates: Vec<DelegateRecord>) -> Self {
            self.delegates.insert(info.address, delegates);
            self.infos.insert(info.address, info);
            self
        }

        pub fn with_transactions(mut self, safe: Address, txs: Vec<ServiceTransaction>) -> Self {
            self.transactions.insert(safe, txs);
            self
        }

        pub fn proposed(&self) -> Vec<ProposedTransaction> {
            self.proposed.lock().clone()
        }

        fn reachable(&self, safe: Address) -> Result<(), ServiceError> {
            if self.unreachable.contains(&safe) {
                return Err(ServiceError::Status {
                    url: format!("mock://safes/{safe:#x}"),
                    status: 503,
                    body: "unavailable".to_string(),
                });
            }
            Ok(())
        }

        fn limit(&self, page: PageRequest) -> PageRequest {
            PageRequest {
                limit: self.page_limit.unwrap_or(page.limit),
                ..page
            }
        }
    }

    #[async_trait]
    impl TransactionService for MockTransactionService {
        async fn safe_info(&self, safe: Address) -> Result<SafeInfo, ServiceError> {
            self.reachable(safe)?;
            self.infos.get(&safe).cloned().ok_or(ServiceError::Status {
                url: format!("mock://safes/{safe:#x}"),
                status: 404,
                body: "not found".to_string(),
            })
        }

        async fn delegates(
            &self,
            safe: Address,
            page: PageRequest,
        ) -> Result<Page<DelegateRecord>, ServiceError> {
            self.reachable(safe)?;
            let all = self.delegates.get(&safe).map(Vec::as_slice).unwrap_or_default();
            Ok(page_of(all, self.limit(page)))
        }

        async fn multisig_transactions(
            &self,
            safe: Address,
            page: PageRequest,
        ) -> Result<Page<ServiceTransaction>, ServiceError> {
            self.reachable(safe)?;
            let all = self.transactions.get(&safe).map(Vec::as_slice).unwrap_or_default();
            Ok(page_of(all, self.limit(page)))
        }

        async fn estimate(&self, safe: Address, _tx: &SafeTxData) -> Result<U256, ServiceError> {
            if self.fail_estimation {
                return Err(ServiceError::Status {
                    url: format!("mock://safes/{safe:#x}/estimations"),
                    status: 422,
                    body: "execution reverted".to_string(),
                });
            }
            Ok(self.safe_tx_gas)
        }

        async fn propose(&self, proposal: &ProposedTransaction) -> Result<(), ServiceError> {
            if self.fail_propose {
                return Err(ServiceError::Status {
                    url: format!("mock://safes/{:#x}/multisig-transactions", proposal.safe),
                    status: 400,
                    body: "nonce already used".to_string(),
                });
            }
            self.proposed.lock().push(proposal.clone());
            Ok(())
        }
    }

    /// Returns the same broadcast list for every request, or fails.
    #[derive(Debug, Clone, Default)]
    pub struct MockSimulator {
        pub calls: Vec<SimulatedCall>,
        pub fail: bool,
        pub requests: Arc<Mutex<Vec<SimulationRequest>>>,
    }

    impl MockSimulator {
        pub fn returning(calls: Vec<SimulatedCall>) -> Self {
            Self {
                calls,
                ..Self::default()
            }
        }

        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl Simulator for MockSimulator {
        async fn simulate(&self, request: &SimulationRequest) -> Result<SimulationOutput, SimulationError> {
            self.requests.lock().push(request.clone());
            if self.fail {
                return Err(SimulationError::Failed {
                    status: "exit status: 1".to_string(),
                    stderr: "revert".to_string(),
                });
            }
            Ok(SimulationOutput {
                command: format!("mock-simulate {}", request.call.function),
                output: String::new(),
                calls: self.calls.clone(),
            })
        }
    }

    /// Records every notification and hands out sequential ids.
    #[derive(Debug, Clone, Default)]
    pub struct MockNotifier {
        pub sent: Arc<Mutex<Vec<(String, String, Option<String>)>>>,
    }

    #[async_trait]
    impl Notifier for MockNotifier {
        async fn notify(
            &self,
            channel: &str,
            body: &str,
            previous: Option<&str>,
        ) -> Result<String, NotifyError> {
            let mut sent = self.sent.lock();
            sent.push((channel.to_string(), body.to_string(), previous.map(str::to_string)));
            Ok(previous
                .map(str::to_string)
                .unwrap_or_else(|| format!("msg-{}", sent.len())))
        }
    }
}
