//! # Sync Configuration
//!
//! Everything one run needs to reach its collaborators. The binary fills
//! it from command-line flags and `SAFE_SYNC_*` environment variables.

use std::path::PathBuf;

use shared_types::{Address, H160};
use thiserror::Error;

/// MultiSendCallOnly v1.3.0, deployed at the same address on most chains.
pub const DEFAULT_MULTI_SEND: Address = H160([
    0x40, 0xa2, 0xac, 0xcb, 0xd9, 0x2b, 0xca, 0x93, 0x8b, 0x02, 0x01, 0x0e, 0x17, 0xa5, 0xb8, 0x92,
    0x9b, 0x49, 0x13, 0x0d,
]);

pub const DEFAULT_DELEGATE_KEY_ENV: &str = "SAFE_SYNC_DELEGATE_KEY";

/// Complete run configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Repository root holding `safes/`, `eoas/`, `transactions/`, `proposals/`.
    pub root: PathBuf,
    pub chain_id: u64,
    /// Transaction service base URL, without the `/api` suffix.
    pub service_url: String,
    pub rpc_url: String,
    /// Simulator program followed by its fixed arguments.
    pub simulator: Vec<String>,
    pub multi_send: Address,
    /// Where per-proposal manifests are written; none when unset.
    pub manifest_dir: Option<PathBuf>,
    /// Plan and hash everything, submit nothing, commit nothing.
    pub dry_run: bool,
    /// Skip the Safe state refresh from the transaction service.
    pub offline: bool,
    /// Environment variable holding the delegate's hex private key.
    pub delegate_key_env: String,
    /// Notification webhook; notifications are only logged when unset.
    pub notify_webhook: Option<String>,
    /// `origin` attached to proposed transactions.
    pub origin: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            chain_id: 1,
            service_url: "https://safe-transaction-mainnet.safe.global".to_string(),
            rpc_url: "http://127.0.0.1:8545".to_string(),
            simulator: vec!["safe-sync-simulate".to_string()],
            multi_send: DEFAULT_MULTI_SEND,
            manifest_dir: None,
            dry_run: false,
            offline: false,
            delegate_key_env: DEFAULT_DELEGATE_KEY_ENV.to_string(),
            notify_webhook: None,
            origin: "safe-sync".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Chain id must be non-zero")]
    ZeroChainId,

    #[error("{field} must be an http(s) URL, got {value:?}")]
    InvalidUrl { field: &'static str, value: String },

    #[error("Simulator command is empty")]
    EmptySimulator,

    #[error("MultiSend address must be non-zero")]
    ZeroMultiSend,

    #[error("Repository root {0} is not a directory")]
    MissingRoot(PathBuf),

    #[error("Delegate key variable name is empty")]
    EmptyKeyEnv,
}

fn check_url(field: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::InvalidUrl {
            field,
            value: value.to_string(),
        })
    }
}

impl SyncConfig {
    /// Validate before any collaborator is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chain_id == 0 {
            return Err(ConfigError::ZeroChainId);
        }
        check_url("service URL", &self.service_url)?;
        check_url("RPC URL", &self.rpc_url)?;
        if let Some(webhook) = &self.notify_webhook {
            check_url("notification webhook", webhook)?;
        }
        if self.simulator.first().map_or(true, |p| p.trim().is_empty()) {
            return Err(ConfigError::EmptySimulator);
        }
        if self.multi_send.is_zero() {
            return Err(ConfigError::ZeroMultiSend);
        }
        if self.delegate_key_env.trim().is_empty() {
            return Err(ConfigError::EmptyKeyEnv);
        }
        if !self.root.is_dir() {
            return Err(ConfigError::MissingRoot(self.root.clone()));
        }
        Ok(())
    }

    /// Transaction service base with any trailing slash removed.
    pub fn service_base(&self) -> &str {
        self.service_url.trim_end_matches('/')
    }
}
