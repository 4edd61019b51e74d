//! # Proposal Manifests
//!
//! One record per processed proposal, for CI reporting. Manifests are kept
//! in memory during the run and written as `<dir>/<index>.json` only after
//! the entity commit succeeded.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use shared_types::{Address, Bytes, Hash, Proposal, U256};
use ss_04_hash_verifier::SafeTxData;

use crate::errors::SyncError;

/// The constructed Safe transaction as recorded in a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestTransaction {
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
    pub operation: u8,
    pub safe_tx_gas: U256,
    pub nonce: u64,
}

impl From<&SafeTxData> for ManifestTransaction {
    fn from(tx: &SafeTxData) -> Self {
        Self {
            to: tx.to,
            value: tx.value,
            data: tx.data.clone(),
            operation: tx.operation.as_u8(),
            safe_tx_gas: tx.safe_tx_gas,
            nonce: tx.nonce,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestSimulation {
    pub command: String,
    pub output: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalManifest {
    pub proposal_path: PathBuf,
    pub proposal: Proposal,
    pub safe: Address,
    pub nonce: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction: Option<ManifestTransaction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimation: Option<U256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub simulation: Option<ManifestSimulation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub safe_tx_hash: Option<Hash>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_hash: Option<Hash>,
    pub submitted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProposalManifest {
    pub fn new(proposal_path: PathBuf, proposal: Proposal, nonce: u64) -> Self {
        Self {
            safe: proposal.safe,
            proposal_path,
            proposal,
            nonce,
            transaction: None,
            estimation: None,
            simulation: None,
            safe_tx_hash: None,
            message_hash: None,
            submitted: false,
            error: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }
}

/// Write `manifests` as `<dir>/<index>.json`, creating `dir` if needed.
pub fn write_manifests(dir: &Path, manifests: &[ProposalManifest]) -> Result<Vec<PathBuf>, SyncError> {
    let io_err = |path: &Path, e: &dyn std::fmt::Display| SyncError::Manifest {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    fs::create_dir_all(dir).map_err(|e| io_err(dir, &e))?;
    let mut written = Vec::with_capacity(manifests.len());
    for (index, manifest) in manifests.iter().enumerate() {
        let path = dir.join(format!("{index}.json"));
        let json = manifest.to_json().map_err(|e| io_err(&path, &e))?;
        fs::write(&path, json).map_err(|e| io_err(&path, &e))?;
        written.push(path);
    }
    Ok(written)
}
