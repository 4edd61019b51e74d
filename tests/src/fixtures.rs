//! Shared builders for end-to-end runs.

use std::path::PathBuf;
use std::sync::Arc;

use shared_types::{
    Address, Bytes, FunctionCall, Hash, NonceSpec, ParentRef, Proposal, ProposalAction, Safe, U256,
};
use ss_01_entity_store::{child_proposal_path, safe_path};
use ss_03_approval_generator::MockCodeInspector;
use ss_04_hash_verifier::MockSafeContract;
use sync_runtime::adapters::LocalKeySigner;
use sync_runtime::domain::{DelegateRecord, SafeInfo, ServiceTransaction, SimulatedCall};
use sync_runtime::ports::outbound::mocks::{MockNotifier, MockSimulator, MockTransactionService};
use sync_runtime::ports::DelegateSigner;
use sync_runtime::{Collaborators, SyncConfig, SyncRunner};
use sync_telemetry::RunMetrics;

/// Well-known development key; its address is the delegate everywhere.
pub const DELEGATE_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

pub const CHAIN_ID: u64 = 1;

pub fn addr(n: u64) -> Address {
    Address::from_low_u64_be(n)
}

/// Pretty JSON with a trailing newline, the way entity files are stored.
pub fn json<T: serde::Serialize>(value: &T) -> String {
    let mut out = serde_json::to_string_pretty(value).unwrap();
    out.push('\n');
    out
}

pub fn signer() -> Arc<LocalKeySigner> {
    Arc::new(LocalKeySigner::from_hex(DELEGATE_KEY, "SAFE_SYNC_DELEGATE_KEY").unwrap())
}

pub fn delegate() -> Address {
    signer().address()
}

pub fn safe_file(address: Address, name: &str) -> (PathBuf, String) {
    (safe_path(name), json(&Safe::bare(address, name)))
}

pub fn proposal_file(name: &str, proposal: &Proposal) -> (PathBuf, String) {
    (PathBuf::from(format!("proposals/{name}.json")), json(proposal))
}

/// A proposal calling `pause()` on a fixed contract.
pub fn pause_proposal(safe: Address) -> Proposal {
    Proposal {
        safe,
        delegate: delegate(),
        nonce: None,
        safe_tx_hash: None,
        description: Some("Pause the vault".to_string()),
        create_child_proposals: false,
        notifications: Vec::new(),
        action: ProposalAction::Call(FunctionCall {
            contract: addr(0xc0),
            function: "pause()".to_string(),
            args: Vec::new(),
            value: U256::zero(),
        }),
    }
}

/// An unsubmitted approval on `owner` of `parent_hash`, stored next to the
/// `pause` proposal the way generated children are.
pub fn child_file(
    owner: Address,
    parent_safe: Address,
    parent_hash: Hash,
    nonce: u64,
) -> (PathBuf, String) {
    let child = Proposal {
        safe: owner,
        delegate: delegate(),
        nonce: Some(NonceSpec::Literal(nonce)),
        safe_tx_hash: None,
        description: Some(format!("Approve {parent_hash:#x}")),
        create_child_proposals: false,
        notifications: Vec::new(),
        action: ProposalAction::ChildOf(ParentRef {
            safe: parent_safe,
            hash: parent_hash,
            position: 0,
        }),
    };
    let path = child_proposal_path(&PathBuf::from("proposals/pause.json"), &parent_hash, 0);
    (path, json(&child))
}

pub fn pause_call() -> SimulatedCall {
    SimulatedCall {
        kind: "CALL".to_string(),
        to: addr(0xc0),
        value: U256::zero(),
        data: Bytes(vec![0x84, 0x56, 0xcb, 0x59]),
    }
}

/// Service-side state for `safe` with the test delegate registered.
pub fn safe_info(safe: Address, threshold: u64, owners: Vec<Address>) -> (SafeInfo, Vec<DelegateRecord>) {
    let delegator = owners.first().copied().unwrap_or_else(|| addr(2));
    (
        SafeInfo {
            address: safe,
            nonce: 0,
            threshold,
            owners,
            version: Some("1.3.0".to_string()),
        },
        vec![DelegateRecord {
            delegate: delegate(),
            delegator,
            label: "sync bot".to_string(),
        }],
    )
}

pub fn service_tx(safe: Address, nonce: u64, hash: u8, executed: bool) -> ServiceTransaction {
    ServiceTransaction {
        safe,
        to: addr(0xc0),
        value: U256::zero(),
        data: None,
        operation: 0,
        safe_tx_gas: U256::zero(),
        base_gas: U256::zero(),
        gas_price: U256::zero(),
        gas_token: None,
        refund_receiver: None,
        nonce,
        safe_tx_hash: Hash::repeat_byte(hash),
        is_executed: executed,
        is_successful: executed.then_some(true),
        transaction_hash: None,
        confirmations: Vec::new(),
    }
}

/// Collaborators for one run. Every port is a mock except the signer.
pub struct Harness {
    pub service: MockTransactionService,
    pub contract: MockSafeContract,
    pub inspector: MockCodeInspector,
    pub simulator: MockSimulator,
    pub notifier: MockNotifier,
    /// `None` runs without a loaded delegate key.
    pub signer: Option<Arc<dyn DelegateSigner>>,
}

impl Harness {
    pub fn new(service: MockTransactionService) -> Self {
        Self {
            service,
            contract: MockSafeContract::new(CHAIN_ID),
            inspector: MockCodeInspector::default(),
            simulator: MockSimulator::returning(vec![pause_call()]),
            notifier: MockNotifier::default(),
            signer: Some(signer() as Arc<dyn DelegateSigner>),
        }
    }

    pub fn runner(&self, config: SyncConfig) -> SyncRunner {
        let parts = Collaborators::new(
            CHAIN_ID,
            Arc::new(self.service.clone()),
            Arc::new(self.contract.clone()),
            Arc::new(self.inspector.clone()),
            Arc::new(self.simulator.clone()),
            self.signer.clone(),
            Arc::new(self.notifier.clone()),
        );
        SyncRunner::new(config, parts, RunMetrics::new("safe-sync-e2e").unwrap())
    }
}
