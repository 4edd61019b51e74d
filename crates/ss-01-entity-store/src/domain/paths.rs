//! Repository layout.
//!
//! ```text
//! safes/<name>.json
//! eoas/<name>.json
//! transactions/<safe>/pending/<nonce>-<safeTxHash>.json
//! transactions/<safe>/executed/<nonce>-<safeTxHash>.json
//! proposals/**/<name>.json
//! proposals/**/<parentHash>.<position>.child.json
//! ```

use std::path::{Path, PathBuf};

use shared_types::{Hash, Transaction};

pub const SAFES_DIR: &str = "safes";
pub const EOAS_DIR: &str = "eoas";
pub const TRANSACTIONS_DIR: &str = "transactions";
pub const PROPOSALS_DIR: &str = "proposals";

const EXTENSION: &str = "json";

pub fn safe_path(name: &str) -> PathBuf {
    Path::new(SAFES_DIR).join(format!("{name}.{EXTENSION}"))
}

/// Canonical path of a transaction; changes when it gets executed.
pub fn transaction_path(tx: &Transaction) -> PathBuf {
    let state = if tx.is_executed() {
        "executed"
    } else {
        "pending"
    };
    Path::new(TRANSACTIONS_DIR)
        .join(format!("{:#x}", tx.safe))
        .join(state)
        .join(format!("{}-{:#x}.{EXTENSION}", tx.nonce, tx.safe_tx_hash))
}

/// Path of the approval generated for owner `position` of a parent proposal.
///
/// Children live next to the proposal that spawned them.
pub fn child_proposal_path(parent_path: &Path, parent_hash: &Hash, position: usize) -> PathBuf {
    let dir = parent_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(PROPOSALS_DIR));
    dir.join(format!("{parent_hash:#x}.{position}.child.{EXTENSION}"))
}

pub(crate) fn is_entity_file(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(EXTENSION)
}
