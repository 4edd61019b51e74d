//! Error types for the sync runtime
//!
//! Library errors from the four core crates propagate unchanged. The
//! runtime adds the failures of its external collaborators and decides
//! which of them a run can survive.

use std::path::PathBuf;

use shared_types::Address;
use ss_01_entity_store::StoreError;
use ss_02_nonce_resolution::NonceError;
use ss_03_approval_generator::ApprovalError;
use ss_04_hash_verifier::VerificationError;
use thiserror::Error;

/// Transaction service failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("HTTP request to {url} failed: {message}")]
    Http { url: String, message: String },

    #[error("{url} returned {status}: {body}")]
    Status { url: String, status: u16, body: String },

    #[error("Malformed service response: {0}")]
    Malformed(String),
}

/// External simulator failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimulationError {
    #[error("Failed to launch simulator {command:?}: {message}")]
    Launch { command: String, message: String },

    #[error("Simulator exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("Simulator produced no broadcast output")]
    MissingOutput,

    #[error("Simulator output is not valid: {0}")]
    Malformed(String),
}

/// Signing failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignerError {
    #[error("Invalid delegate key in {env}: {message}")]
    InvalidKey { env: String, message: String },

    #[error("Signing failed: {0}")]
    Signing(String),
}

/// Notification channel failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Notification to {channel} failed: {message}")]
pub struct NotifyError {
    pub channel: String,
    pub message: String,
}

/// The proposal may be simulated and estimated but not submitted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthorizationError {
    #[error("Delegate {delegate:#x} is not registered on Safe {safe:#x}")]
    DelegateNotRegistered { safe: Address, delegate: Address },

    #[error("Signer key not loaded (set {env})")]
    SignerNotLoaded { env: String },

    #[error("Signer {actual:#x} is not the proposal delegate {expected:#x}")]
    SignerMismatch { expected: Address, actual: Address },
}

/// All errors that can end or degrade a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Nonce(#[from] NonceError),

    #[error(transparent)]
    Approval(#[from] ApprovalError),

    #[error(transparent)]
    Verification(#[from] VerificationError),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error(transparent)]
    Simulation(#[from] SimulationError),

    #[error("Proposal {proposal}: {source}")]
    Authorization {
        proposal: PathBuf,
        #[source]
        source: AuthorizationError,
    },

    #[error(transparent)]
    Signer(#[from] SignerError),

    #[error("Proposal {proposal}: simulator planned a {kind} transaction; only CALL is supported")]
    UnsupportedCall { proposal: PathBuf, kind: String },

    #[error("Proposal {proposal} targets Safe {safe:#x}, which is not in the repository")]
    MissingSafe { proposal: PathBuf, safe: Address },

    #[error("Failed to write manifest {path}: {message}")]
    Manifest { path: PathBuf, message: String },
}

impl SyncError {
    /// Recoverable failures are recorded in the proposal's manifest and the
    /// run moves on; everything else aborts before anything is committed.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SyncError::Service(_) | SyncError::Simulation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{EntityKind, Hash};

    #[test]
    fn test_error_display() {
        let err = SyncError::Authorization {
            proposal: PathBuf::from("proposals/upgrade.json"),
            source: AuthorizationError::DelegateNotRegistered {
                safe: Address::from_low_u64_be(1),
                delegate: Address::from_low_u64_be(2),
            },
        };
        assert_eq!(
            err.to_string(),
            "Proposal proposals/upgrade.json: Delegate 0x0000000000000000000000000000000000000002 \
             is not registered on Safe 0x0000000000000000000000000000000000000001"
        );

        let err = SyncError::UnsupportedCall {
            proposal: PathBuf::from("proposals/deploy.json"),
            kind: "CREATE".to_string(),
        };
        assert!(err.to_string().contains("CREATE"));
    }

    #[test]
    fn test_recoverable_classes() {
        assert!(SyncError::Service(ServiceError::Malformed("no body".to_string())).is_recoverable());
        assert!(SyncError::Simulation(SimulationError::MissingOutput).is_recoverable());

        let integrity = SyncError::Store(StoreError::DuplicateEntity {
            kind: EntityKind::Safe,
            field: "name",
            value: "treasury".to_string(),
        });
        assert!(!integrity.is_recoverable());

        let mismatch = SyncError::Verification(VerificationError::HashMismatch {
            safe: Address::zero(),
            nonce: 1,
            computed: Hash::zero(),
            on_chain: Hash::repeat_byte(1),
        });
        assert!(!mismatch.is_recoverable());

        let auth = SyncError::Authorization {
            proposal: PathBuf::from("p.json"),
            source: AuthorizationError::SignerNotLoaded {
                env: "SAFE_SYNC_DELEGATE_KEY".to_string(),
            },
        };
        assert!(!auth.is_recoverable());
    }
}
