//! # Sync Runner
//!
//! One complete run over a repository:
//!
//! ```text
//! load ──→ sync Safes ──→ schedule nonces ──→ sync proposals (per Safe, by nonce)
//!                                                   │
//!                               dry run: diff ←─────┴────→ commit ──→ manifests
//! ```
//!
//! Nothing reaches storage before the commit; a fatal error anywhere
//! before it leaves the repository untouched. Manifests of proposals
//! processed before the error are still written.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::path::PathBuf;

use shared_types::{Address, Hash, ParentRef};
use ss_01_entity_store::{EntityBackend, EntityStore, LoadSummary, SaveSummary};
use ss_02_nonce_resolution::NonceCandidate;
use sync_telemetry::RunMetrics;
use tracing::{info, warn};

use super::proposals::sync_proposal;
use super::safes::{apply_snapshot, fetch_snapshot};
use super::{RunContext, RunState};
use crate::container::{Collaborators, SyncConfig};
use crate::domain::{write_manifests, ProposalManifest};
use crate::errors::SyncError;

/// Outcome of a completed run.
#[derive(Debug, Default)]
pub struct RunReport {
    pub loaded: LoadSummary,
    pub synced_safes: Vec<Address>,
    /// Safes whose state could not be fetched, with the reason. Their
    /// proposals were left out of the run.
    pub failed_safes: Vec<(Address, String)>,
    pub scheduled: usize,
    pub children: usize,
    /// Unsubmitted children whose parent hash is gone, marked for deletion.
    pub stale_children: Vec<PathBuf>,
    pub manifests: Vec<ProposalManifest>,
    /// `None` in dry-run mode.
    pub commit: Option<SaveSummary>,
    /// Pending changes, computed only in dry-run mode.
    pub diff: Option<String>,
    pub manifest_files: Vec<PathBuf>,
}

impl RunReport {
    pub fn submitted(&self) -> usize {
        self.manifests.iter().filter(|m| m.submitted).count()
    }

    pub fn failed(&self) -> usize {
        self.manifests.iter().filter(|m| m.is_error()).count()
    }

    /// Human-readable summary for the end of a run.
    pub fn summary(&self) -> String {
        let mut out = format!(
            "Loaded {} safes, {} eoas, {} transactions, {} proposals\n",
            self.loaded.safes, self.loaded.eoas, self.loaded.transactions, self.loaded.proposals
        );
        let _ = writeln!(
            out,
            "Synced {} safes ({} failed)",
            self.synced_safes.len(),
            self.failed_safes.len()
        );
        for (safe, reason) in &self.failed_safes {
            let _ = writeln!(out, "  {safe:#x}: {reason}");
        }
        let _ = writeln!(
            out,
            "Proposals: {} scheduled, {} children, {} submitted, {} failed",
            self.scheduled,
            self.children,
            self.submitted(),
            self.failed()
        );
        for path in &self.stale_children {
            let _ = writeln!(out, "  removed stale child {}", path.display());
        }
        for manifest in self.manifests.iter().filter(|m| m.is_error()) {
            let _ = writeln!(
                out,
                "  {}: {}",
                manifest.proposal_path.display(),
                manifest.error.as_deref().unwrap_or_default()
            );
        }
        match &self.commit {
            Some(commit) => out.push_str(&commit.commit_message),
            None => out.push_str("Dry run: nothing committed"),
        }
        out.push('\n');
        out
    }
}

pub struct SyncRunner {
    config: SyncConfig,
    parts: Collaborators,
    metrics: RunMetrics,
}

impl SyncRunner {
    pub fn new(config: SyncConfig, parts: Collaborators, metrics: RunMetrics) -> Self {
        Self {
            config,
            parts,
            metrics,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn metrics(&self) -> &RunMetrics {
        &self.metrics
    }

    /// Run one sync over the repository behind `backend`.
    pub async fn run(&self, backend: Box<dyn EntityBackend>) -> Result<RunReport, SyncError> {
        let _timer = self.metrics.time_run();
        let ctx = RunContext {
            config: &self.config,
            parts: &self.parts,
            metrics: &self.metrics,
        };
        let mut report = RunReport::default();

        let mut store = EntityStore::new(backend);
        report.loaded = store.load()?;

        if self.config.offline {
            info!("Offline: skipping Safe state sync");
        } else {
            self.sync_safes(&mut store, &mut report).await?;
        }

        let mut state = RunState::new(store);
        let candidates = candidates(&state.store, &report.failed_safes);
        let schedules = state.resolver.schedule(&state.store, candidates)?;
        report.scheduled = schedules.iter().map(|s| s.proposals.len()).sum();
        self.metrics.proposals_scheduled.set(report.scheduled as i64);

        for schedule in &schedules {
            for scheduled in &schedule.proposals {
                let mut approval_path = self.parts.approvals.path();
                let synced =
                    sync_proposal(&ctx, &mut state, &mut approval_path, scheduled.index, scheduled.nonce)
                        .await;
                if let Err(err) = synced {
                    self.write_failure_manifests(&state.manifests);
                    return Err(err);
                }
            }
        }
        report.children = state.children;
        report.stale_children = prune_stale_children(&mut state, &report.failed_safes)?;

        if self.config.dry_run {
            report.diff = Some(state.store.diff()?);
        } else {
            let commit = state.store.save()?;
            self.metrics
                .record_commit(commit.created, commit.edited, commit.deleted);
            report.commit = Some(commit);
            if let Some(dir) = &self.config.manifest_dir {
                report.manifest_files = write_manifests(dir, &state.manifests)?;
            }
        }
        report.manifests = state.manifests;

        info!(
            scheduled = report.scheduled,
            children = report.children,
            submitted = report.submitted(),
            failed = report.failed(),
            dry_run = self.config.dry_run,
            "Sync run finished"
        );
        Ok(report)
    }

    /// Manifests gathered before a fatal error still reach CI; the
    /// repository itself stays untouched.
    fn write_failure_manifests(&self, manifests: &[ProposalManifest]) {
        let Some(dir) = self.config.manifest_dir.as_deref().filter(|_| !self.config.dry_run) else {
            return;
        };
        if let Err(err) = write_manifests(dir, manifests) {
            warn!(error = %err, "Failed to write manifests of the aborted run");
        }
    }

    async fn sync_safes(&self, store: &mut EntityStore, report: &mut RunReport) -> Result<(), SyncError> {
        let addresses: Vec<Address> = store.safes().map(|e| e.entity.address()).collect();
        for safe in addresses {
            match fetch_snapshot(self.parts.service.as_ref(), safe).await {
                Ok(snapshot) => {
                    apply_snapshot(store, safe, snapshot)?;
                    self.metrics.safes_synced.inc();
                    report.synced_safes.push(safe);
                }
                Err(err) => {
                    warn!(safe = %format!("{safe:#x}"), error = %err, "Safe sync failed");
                    self.metrics.safe_sync_failures.inc();
                    report.failed_safes.push((safe, err.to_string()));
                }
            }
        }
        Ok(())
    }
}

/// A child's parent transaction exists outside this run's regeneration.
fn parent_is_known(store: &EntityStore, parent: &ParentRef) -> bool {
    store.proposal_by_hash(&parent.hash).is_some() || store.transaction_by_hash(&parent.hash).is_some()
}

/// Every unsubmitted top-level proposal of a Safe that synced.
///
/// A child only comes along when its parent is already submitted or known
/// as a transaction: nothing will regenerate it, and the hash it approves is
/// real. Children of unsubmitted parents wait for their parent's sync.
fn candidates(store: &EntityStore, failed: &[(Address, String)]) -> Vec<NonceCandidate> {
    store
        .proposals()
        .filter(|e| !e.entity.is_submitted())
        .filter(|e| !failed.iter().any(|(safe, _)| *safe == e.entity.safe))
        .filter(|e| match e.entity.parent() {
            None => true,
            Some(parent) => parent_is_known(store, parent),
        })
        .map(|e| NonceCandidate {
            index: e.index,
            label: e.path.display().to_string(),
            safe: e.entity.safe,
            nonce: e.entity.nonce.clone(),
        })
        .collect()
}

/// Mark for deletion every unsubmitted child approving a hash that no
/// proposal synced this run, no submitted proposal and no transaction has.
///
/// Children whose parent Safe failed to sync, or had a proposal fail this
/// run, are kept: their parent's hash is not known yet.
fn prune_stale_children(
    state: &mut RunState,
    failed_safes: &[(Address, String)],
) -> Result<Vec<PathBuf>, SyncError> {
    let hashed: HashSet<Hash> = state.manifests.iter().filter_map(|m| m.safe_tx_hash).collect();
    let held: HashSet<Address> = failed_safes
        .iter()
        .map(|(safe, _)| *safe)
        .chain(state.manifests.iter().filter(|m| m.is_error()).map(|m| m.safe))
        .collect();

    let stale: Vec<(usize, PathBuf)> = state
        .store
        .proposals()
        .filter(|e| !e.entity.is_submitted())
        .filter(|e| match e.entity.parent() {
            Some(parent) => {
                !held.contains(&parent.safe)
                    && !hashed.contains(&parent.hash)
                    && !parent_is_known(&state.store, parent)
            }
            None => false,
        })
        .map(|e| (e.index, e.path.to_path_buf()))
        .collect();

    for (index, path) in &stale {
        warn!(proposal = %path.display(), "Removing child of a transaction that no longer exists");
        state.store.write_proposal(*index, None)?;
    }
    Ok(stale.into_iter().map(|(_, path)| path).collect())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::adapters::LocalKeySigner;
    use crate::domain::{DelegateRecord, SafeInfo, SimulatedCall};
    use crate::ports::outbound::mocks::{MockNotifier, MockSimulator, MockTransactionService};
    use crate::ports::DelegateSigner;
    use shared_types::{Bytes, FunctionCall, Proposal, ProposalAction, Safe, U256};
    use ss_01_entity_store::{safe_path, MemoryBackend};
    use ss_03_approval_generator::MockCodeInspector;
    use ss_04_hash_verifier::MockSafeContract;

    const KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn addr(n: u64) -> Address {
        Address::from_low_u64_be(n)
    }

    fn json<T: serde::Serialize>(value: &T) -> String {
        let mut out = serde_json::to_string_pretty(value).unwrap();
        out.push('\n');
        out
    }

    fn proposal(safe: Address, delegate: Address) -> Proposal {
        Proposal {
            safe,
            delegate,
            nonce: None,
            safe_tx_hash: None,
            description: None,
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

    fn call() -> SimulatedCall {
        SimulatedCall {
            kind: "CALL".to_string(),
            to: addr(0xc0),
            value: U256::zero(),
            data: Bytes(vec![0x84, 0x56, 0xcb, 0x59]),
        }
    }

    struct Fixture {
        backend: MemoryBackend,
        service: MockTransactionService,
        signer: Arc<LocalKeySigner>,
    }

    fn fixture() -> Fixture {
        let signer = Arc::new(LocalKeySigner::from_hex(KEY, "TEST_KEY").unwrap());
        let delegate = signer.address();
        let backend = MemoryBackend::with_files([
            (safe_path("ops"), json(&Safe::bare(addr(1), "ops"))),
            (
                PathBuf::from("proposals/pause.json"),
                json(&proposal(addr(1), delegate)),
            ),
        ]);
        let service = MockTransactionService::new().with_safe(
            SafeInfo {
                address: addr(1),
                nonce: 0,
                threshold: 1,
                owners: vec![addr(2)],
                version: Some("1.3.0".to_string()),
            },
            vec![DelegateRecord {
                delegate,
                delegator: addr(2),
                label: "bot".to_string(),
            }],
        );
        Fixture {
            backend,
            service,
            signer,
        }
    }

    fn runner(config: SyncConfig, fixture: &Fixture, simulator: MockSimulator) -> SyncRunner {
        let parts = Collaborators::new(
            1,
            Arc::new(fixture.service.clone()),
            Arc::new(MockSafeContract::new(1)),
            Arc::new(MockCodeInspector::default()),
            Arc::new(simulator),
            Some(fixture.signer.clone() as Arc<dyn DelegateSigner>),
            Arc::new(MockNotifier::default()),
        );
        SyncRunner::new(config, parts, RunMetrics::new("safe-sync-test").unwrap())
    }

    #[tokio::test]
    async fn test_submits_and_commits() {
        let fixture = fixture();
        let runner = runner(SyncConfig::default(), &fixture, MockSimulator::returning(vec![call()]));
        let report = runner.run(Box::new(fixture.backend.clone())).await.unwrap();

        assert_eq!(report.scheduled, 1);
        assert_eq!(report.submitted(), 1);
        let proposed = fixture.service.proposed();
        assert_eq!(proposed.len(), 1);
        assert_eq!(proposed[0].nonce, 0);

        let written: Proposal =
            serde_json::from_str(&fixture.backend.get("proposals/pause.json").unwrap()).unwrap();
        assert_eq!(written.safe_tx_hash, Some(proposed[0].contract_transaction_hash));
        assert!(fixture.backend.get(safe_path("ops")).unwrap().contains("\"owners\""));
        assert!(report.summary().contains("1 submitted"));
    }

    #[tokio::test]
    async fn test_dry_run_leaves_storage_untouched() {
        let fixture = fixture();
        let before = fixture.backend.get("proposals/pause.json");
        let config = SyncConfig {
            dry_run: true,
            ..SyncConfig::default()
        };
        let runner = runner(config, &fixture, MockSimulator::returning(vec![call()]));
        let report = runner.run(Box::new(fixture.backend.clone())).await.unwrap();

        assert!(report.commit.is_none());
        assert!(report.diff.as_deref().unwrap().contains("+++ b/safes/ops.json"));
        assert!(report.manifests[0].safe_tx_hash.is_some());
        assert!(!report.manifests[0].submitted);
        assert!(fixture.service.proposed().is_empty());
        assert_eq!(fixture.backend.get("proposals/pause.json"), before);
    }

    #[tokio::test]
    async fn test_simulation_failure_is_recorded() {
        let fixture = fixture();
        let runner = runner(SyncConfig::default(), &fixture, MockSimulator::failing());
        let report = runner.run(Box::new(fixture.backend.clone())).await.unwrap();

        assert_eq!(report.failed(), 1);
        assert!(report.manifests[0].error.as_deref().unwrap().contains("revert"));
        assert!(fixture.service.proposed().is_empty());
        assert!(report.commit.is_some());
    }

    #[tokio::test]
    async fn test_unsupported_call_aborts_without_commit() {
        let fixture = fixture();
        let before = fixture.backend.paths();
        let mut create = call();
        create.kind = "CREATE".to_string();
        let runner = runner(SyncConfig::default(), &fixture, MockSimulator::returning(vec![create]));

        let err = runner.run(Box::new(fixture.backend.clone())).await.unwrap_err();
        assert!(matches!(err, SyncError::UnsupportedCall { .. }));
        assert_eq!(fixture.backend.paths(), before);
        assert!(!fixture.backend.get(safe_path("ops")).unwrap().contains("\"owners\""));
    }

    #[tokio::test]
    async fn test_unreachable_safe_excludes_its_proposals() {
        let mut fixture = fixture();
        fixture.service.unreachable.push(addr(1));
        let runner = runner(SyncConfig::default(), &fixture, MockSimulator::returning(vec![call()]));
        let report = runner.run(Box::new(fixture.backend.clone())).await.unwrap();

        assert_eq!(report.failed_safes.len(), 1);
        assert_eq!(report.scheduled, 0);
        assert!(report.manifests.is_empty());
        assert_eq!(runner.metrics().safe_sync_failures.get(), 1);
    }
}
