//! # Collaborator Container
//!
//! Builds the outbound adapters a run needs from `SyncConfig` and holds
//! them behind their ports, so tests can swap in the in-memory mocks.
//!
//! ```text
//! SyncConfig ──→ HttpTransactionService ──→ TransactionService
//!            ──→ JsonRpcClient ──┬────────→ SafeContract   (TransactionHashVerifier)
//!                                └────────→ CodeInspector  (ApprovalGenerator)
//!            ──→ CommandSimulator ────────→ Simulator
//!            ──→ LocalKeySigner ──────────→ DelegateSigner (optional)
//!            ──→ Webhook/LogNotifier ─────→ Notifier
//! ```

pub mod config;

use std::sync::Arc;

use anyhow::{Context, Result};
use ss_03_approval_generator::{ApprovalConfig, ApprovalGenerator, CodeInspector};
use ss_04_hash_verifier::{SafeContract, TransactionHashVerifier};
use tracing::{info, warn};

pub use config::{ConfigError, SyncConfig, DEFAULT_DELEGATE_KEY_ENV, DEFAULT_MULTI_SEND};

use crate::adapters::{
    CommandSimulator, HttpTransactionService, JsonRpcClient, LocalKeySigner, LogNotifier,
    WebhookNotifier,
};
use crate::ports::{DelegateSigner, Notifier, Simulator, TransactionService};

/// Every external collaborator of a run.
pub struct Collaborators {
    pub service: Arc<dyn TransactionService>,
    pub simulator: Arc<dyn Simulator>,
    /// `None` when no delegate key is configured; submission then fails
    /// with an authorization error.
    pub signer: Option<Arc<dyn DelegateSigner>>,
    pub notifier: Arc<dyn Notifier>,
    pub verifier: TransactionHashVerifier<Arc<dyn SafeContract>>,
    pub approvals: ApprovalGenerator<Arc<dyn CodeInspector>>,
}

impl Collaborators {
    /// Assemble collaborators from already-built ports.
    pub fn new(
        chain_id: u64,
        service: Arc<dyn TransactionService>,
        contract: Arc<dyn SafeContract>,
        inspector: Arc<dyn CodeInspector>,
        simulator: Arc<dyn Simulator>,
        signer: Option<Arc<dyn DelegateSigner>>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            service,
            simulator,
            signer,
            notifier,
            verifier: TransactionHashVerifier::new(contract, chain_id),
            approvals: ApprovalGenerator::new(inspector, ApprovalConfig::default()),
        }
    }

    /// Build the production adapters.
    pub fn from_config(config: &SyncConfig) -> Result<Self> {
        let service = HttpTransactionService::new(config.service_url.clone())
            .context("Failed to build transaction service client")?;
        let rpc = Arc::new(
            JsonRpcClient::new(config.rpc_url.clone()).context("Failed to build JSON-RPC client")?,
        );

        let signer = LocalKeySigner::from_env(&config.delegate_key_env)
            .context("Failed to load delegate key")?
            .map(|signer| Arc::new(signer) as Arc<dyn DelegateSigner>);
        match &signer {
            Some(signer) => info!(delegate = %format!("{:#x}", signer.address()), "Delegate key loaded"),
            None if !config.dry_run => {
                warn!(env = %config.delegate_key_env, "No delegate key configured; proposals cannot be submitted")
            }
            None => {}
        }

        let notifier: Arc<dyn Notifier> = match &config.notify_webhook {
            Some(url) => Arc::new(
                WebhookNotifier::new(url.clone()).context("Failed to build notification client")?,
            ),
            None => Arc::new(LogNotifier::default()),
        };

        Ok(Self::new(
            config.chain_id,
            Arc::new(service),
            rpc.clone(),
            rpc,
            Arc::new(CommandSimulator::new(&config.simulator)),
            signer,
            notifier,
        ))
    }
}
