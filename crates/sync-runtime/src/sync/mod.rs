//! The sync run: Safe state refresh, nonce scheduling, proposal sync and
//! the terminal commit.

pub mod proposals;
pub mod run;
pub mod safes;

use ss_01_entity_store::EntityStore;
use ss_02_nonce_resolution::NonceResolver;
use sync_telemetry::RunMetrics;

use crate::container::{Collaborators, SyncConfig};
use crate::domain::ProposalManifest;

pub use proposals::{render_notification, sync_proposal};
pub use run::{RunReport, SyncRunner};
pub use safes::{apply_snapshot, fetch_snapshot, SafeSyncSummary};

/// Read-only handles shared by every step of a run.
#[derive(Clone, Copy)]
pub struct RunContext<'a> {
    pub config: &'a SyncConfig,
    pub parts: &'a Collaborators,
    pub metrics: &'a RunMetrics,
}

/// State a run mutates.
pub struct RunState {
    pub store: EntityStore,
    pub resolver: NonceResolver,
    pub manifests: Vec<ProposalManifest>,
    /// Child proposals prepared this run.
    pub children: usize,
}

impl RunState {
    pub fn new(store: EntityStore) -> Self {
        Self {
            store,
            resolver: NonceResolver::new(),
            manifests: Vec::new(),
            children: 0,
        }
    }
}
