//! # Sync Scenarios
//!
//! Full runs over an in-memory repository:
//!
//! 1. **Nonce assignment**: automatic nonces start after the executed history
//! 2. **Approval children**: a Safe owned by a Safe gets one `approveHash` child
//! 3. **History counters**: executed and pending nonces come from the service
//! 4. **Hash verification**: a disagreeing contract stops the run before signing
//! 5. **Regeneration**: a second run over committed output changes nothing
//! 6. **Leftover children**: stale approvals are dropped, orphans of submitted
//!    parents are picked up
//! 7. **Fatal paths**: ownership cycles and missing authorization abort the
//!    run without committing

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use std::fs;

    use shared_types::{Hash, NonceSpec, Proposal, ProposalAction};
    use ss_01_entity_store::{EntityStore, MemoryBackend};
    use ss_03_approval_generator::{ApprovalError, MockCodeInspector};
    use ss_04_hash_verifier::abi::approve_hash_calldata;
    use ss_04_hash_verifier::{MockSafeContract, VerificationError};
    use sync_runtime::errors::AuthorizationError;
    use sync_runtime::ports::outbound::mocks::MockTransactionService;
    use sync_runtime::{SyncConfig, SyncError};
    use tempfile::TempDir;

    use crate::fixtures::*;

    const S: u64 = 0x5a;
    const P: u64 = 0x50;
    const C: u64 = 0xc1;
    const X: u64 = 0x58;
    const A: u64 = 0xa0;
    const B: u64 = 0xb0;

    fn read_proposal(backend: &MemoryBackend, path: &str) -> Proposal {
        serde_json::from_str(&backend.get(path).unwrap()).unwrap()
    }

    fn snapshot(backend: &MemoryBackend) -> Vec<(PathBuf, Option<String>)> {
        backend
            .paths()
            .into_iter()
            .map(|p| {
                let content = backend.get(&p);
                (p, content)
            })
            .collect()
    }

    // =========================================================================
    // NONCE ASSIGNMENT
    // =========================================================================

    /// Two proposals without a nonce on a Safe with no history get 0 and 1.
    #[tokio::test]
    async fn test_fresh_safe_assigns_consecutive_nonces() {
        let (info, delegates) = safe_info(addr(S), 2, vec![addr(0x01), addr(0x02)]);
        let harness = Harness::new(MockTransactionService::new().with_safe(info, delegates));
        let backend = MemoryBackend::with_files([
            safe_file(addr(S), "treasury"),
            proposal_file("first", &pause_proposal(addr(S))),
            proposal_file("second", &pause_proposal(addr(S))),
        ]);

        let report = harness
            .runner(SyncConfig::default())
            .run(Box::new(backend.clone()))
            .await
            .unwrap();

        assert_eq!(report.scheduled, 2);
        assert_eq!(report.submitted(), 2);
        let nonces: Vec<u64> = harness.service.proposed().iter().map(|t| t.nonce).collect();
        assert_eq!(nonces, vec![0, 1]);

        let first = read_proposal(&backend, "proposals/first.json");
        let second = read_proposal(&backend, "proposals/second.json");
        assert!(first.is_submitted());
        assert!(second.is_submitted());
        assert_ne!(first.safe_tx_hash, second.safe_tx_hash);
    }

    /// An explicit nonce holds its slot; automatic ones flow around it.
    #[tokio::test]
    async fn test_explicit_nonce_is_skipped_by_auto() {
        let (info, delegates) = safe_info(addr(S), 1, vec![addr(0x01)]);
        let harness = Harness::new(MockTransactionService::new().with_safe(info, delegates));
        let mut pinned = pause_proposal(addr(S));
        pinned.nonce = Some(NonceSpec::Literal(0));
        let backend = MemoryBackend::with_files([
            safe_file(addr(S), "treasury"),
            proposal_file("auto", &pause_proposal(addr(S))),
            proposal_file("pinned", &pinned),
        ]);

        let report = harness
            .runner(SyncConfig::default())
            .run(Box::new(backend.clone()))
            .await
            .unwrap();

        let by_path = |name: &str| {
            report
                .manifests
                .iter()
                .find(|m| m.proposal_path == PathBuf::from(format!("proposals/{name}.json")))
                .map(|m| m.nonce)
        };
        assert_eq!(by_path("pinned"), Some(0));
        assert_eq!(by_path("auto"), Some(1));
    }

    // =========================================================================
    // APPROVAL CHILDREN
    // =========================================================================

    fn nested_harness() -> (Harness, MemoryBackend) {
        nested_harness_with(Vec::new())
    }

    /// P owned by Safe C, plus `extra` files laid over the repository.
    fn nested_harness_with(extra: Vec<(PathBuf, String)>) -> (Harness, MemoryBackend) {
        let (p_info, p_delegates) = safe_info(addr(P), 1, vec![addr(C)]);
        let (c_info, c_delegates) = safe_info(addr(C), 1, vec![addr(0x01)]);
        let mut harness = Harness::new(
            MockTransactionService::new()
                .with_safe(p_info, p_delegates)
                .with_safe(c_info, c_delegates),
        );
        harness.inspector = MockCodeInspector::with_contracts([addr(C)]);

        let mut proposal = pause_proposal(addr(P));
        proposal.create_child_proposals = true;
        let mut files = vec![
            safe_file(addr(P), "vault"),
            safe_file(addr(C), "council"),
            proposal_file("pause", &proposal),
        ];
        files.extend(extra);
        (harness, MemoryBackend::with_files(files))
    }

    /// P is owned by Safe C, which shares the delegate: exactly one child
    /// targeting C approves P's hash.
    #[tokio::test]
    async fn test_safe_owner_gets_one_approval_child() {
        let (harness, backend) = nested_harness();

        let report = harness
            .runner(SyncConfig::default())
            .run(Box::new(backend.clone()))
            .await
            .unwrap();

        assert_eq!(report.children, 1);
        let proposed = harness.service.proposed();
        assert_eq!(proposed.len(), 2);
        // The approval goes out before the parent it approves.
        let approval = &proposed[0];
        let parent_hash = proposed[1].contract_transaction_hash;
        assert_eq!(proposed[1].safe, addr(P));

        assert_eq!(approval.safe, addr(C));
        assert_eq!(approval.to, addr(P));
        assert_eq!(approval.data, Some(approve_hash_calldata(&parent_hash)));
        assert_eq!(approval.nonce, 0);

        let children: Vec<PathBuf> = backend
            .paths()
            .into_iter()
            .filter(|p| p.to_string_lossy().ends_with(".child.json"))
            .collect();
        assert_eq!(children.len(), 1);
        let child: Proposal = serde_json::from_str(&backend.get(&children[0]).unwrap()).unwrap();
        assert_eq!(child.safe, addr(C));
        assert_eq!(child.nonce, Some(NonceSpec::Literal(0)));
        match child.action {
            ProposalAction::ChildOf(parent) => {
                assert_eq!(parent.safe, addr(P));
                assert_eq!(parent.hash, parent_hash);
                assert_eq!(parent.position, 0);
            }
            other => panic!("expected a child proposal, got {other:?}"),
        }
    }

    /// An owner without code is signed for directly and gets no child.
    #[tokio::test]
    async fn test_eoa_owner_gets_no_child() {
        let (mut harness, backend) = nested_harness();
        harness.inspector = MockCodeInspector::default();

        let report = harness
            .runner(SyncConfig::default())
            .run(Box::new(backend.clone()))
            .await
            .unwrap();

        assert_eq!(report.children, 0);
        assert_eq!(harness.service.proposed().len(), 1);
    }

    // =========================================================================
    // HISTORY COUNTERS
    // =========================================================================

    /// X executed nonce 4 and has 5 pending: the refreshed store reports
    /// 4 and 5, and `pn` resolves past the pending transaction.
    #[tokio::test]
    async fn test_history_counters_follow_service() {
        let (info, delegates) = safe_info(addr(X), 1, vec![addr(0x01)]);
        let service = MockTransactionService::new()
            .with_safe(info, delegates)
            .with_transactions(
                addr(X),
                vec![service_tx(addr(X), 5, 0x55, false), service_tx(addr(X), 4, 0x44, true)],
            );
        let harness = Harness::new(service);
        let mut after_pending = pause_proposal(addr(X));
        after_pending.nonce = Some(NonceSpec::Expression("pn".to_string()));
        let backend = MemoryBackend::with_files([
            safe_file(addr(X), "ops"),
            proposal_file("after-pending", &after_pending),
        ]);

        harness
            .runner(SyncConfig::default())
            .run(Box::new(backend.clone()))
            .await
            .unwrap();

        let mut store = EntityStore::new(Box::new(backend.clone()));
        let loaded = store.load().unwrap();
        assert_eq!(loaded.transactions, 2);
        assert_eq!(store.highest_executed_nonce(&addr(X)), Some(4));
        assert_eq!(store.highest_nonce(&addr(X)), Some(5));
        assert_eq!(harness.service.proposed()[0].nonce, 6);
    }

    // =========================================================================
    // HASH VERIFICATION
    // =========================================================================

    /// A contract hashing different parameters stops the run before anything
    /// is signed, proposed or committed.
    #[tokio::test]
    async fn test_hash_mismatch_aborts_run() {
        let (info, delegates) = safe_info(addr(S), 1, vec![addr(0x01)]);
        let mut harness = Harness::new(MockTransactionService::new().with_safe(info, delegates));
        harness.contract = MockSafeContract::new(CHAIN_ID).returning(Hash::repeat_byte(0xee));
        let backend = MemoryBackend::with_files([
            safe_file(addr(S), "treasury"),
            proposal_file("pause", &pause_proposal(addr(S))),
        ]);
        let before = backend.get("proposals/pause.json");

        let err = harness
            .runner(SyncConfig::default())
            .run(Box::new(backend.clone()))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SyncError::Verification(VerificationError::HashMismatch { .. })
        ));
        assert!(harness.service.proposed().is_empty());
        assert_eq!(backend.get("proposals/pause.json"), before);
    }

    /// A contract on another chain disagrees on the domain separator.
    #[tokio::test]
    async fn test_wrong_chain_is_a_mismatch() {
        let (info, delegates) = safe_info(addr(S), 1, vec![addr(0x01)]);
        let mut harness = Harness::new(MockTransactionService::new().with_safe(info, delegates));
        harness.contract = MockSafeContract::new(CHAIN_ID + 4);
        let backend = MemoryBackend::with_files([
            safe_file(addr(S), "treasury"),
            proposal_file("pause", &pause_proposal(addr(S))),
        ]);

        let result = harness
            .runner(SyncConfig::default())
            .run(Box::new(backend))
            .await;

        assert!(matches!(result, Err(SyncError::Verification(_))));
    }

    // =========================================================================
    // REGENERATION
    // =========================================================================

    /// Running again over committed output proposes and changes nothing.
    #[tokio::test]
    async fn test_second_run_is_idempotent() {
        let (harness, backend) = nested_harness();

        let first = harness
            .runner(SyncConfig::default())
            .run(Box::new(backend.clone()))
            .await
            .unwrap();
        assert!(!first.commit.unwrap().is_empty());
        let files = backend.paths();

        let second = harness
            .runner(SyncConfig::default())
            .run(Box::new(backend.clone()))
            .await
            .unwrap();

        assert_eq!(second.scheduled, 0);
        assert!(second.commit.unwrap().is_empty());
        assert_eq!(harness.service.proposed().len(), 2);
        assert_eq!(backend.paths(), files);
    }

    /// Dry runs compute the same hash a real run later submits.
    #[tokio::test]
    async fn test_dry_run_matches_real_hash() {
        let (harness, backend) = nested_harness();
        let dry = SyncConfig {
            dry_run: true,
            ..SyncConfig::default()
        };

        let preview = harness.runner(dry).run(Box::new(backend.clone())).await.unwrap();
        assert!(preview.commit.is_none());
        assert!(harness.service.proposed().is_empty());

        let real = harness
            .runner(SyncConfig::default())
            .run(Box::new(backend.clone()))
            .await
            .unwrap();
        assert_eq!(preview.manifests[0].safe_tx_hash, real.manifests[0].safe_tx_hash);
        assert_eq!(preview.children, real.children);
    }

    // =========================================================================
    // LEFTOVER CHILDREN
    // =========================================================================

    /// A child left by an earlier run approves a hash the parent no longer
    /// has: it is neither scheduled nor proposed, the regenerated approval
    /// takes nonce 0 on C, and the stale file is deleted.
    #[tokio::test]
    async fn test_stale_child_is_dropped() {
        let stale_hash = Hash::repeat_byte(0xee);
        let stale = child_file(addr(C), addr(P), stale_hash, 0);
        let stale_path = stale.0.clone();
        let (harness, backend) = nested_harness_with(vec![stale]);

        let report = harness
            .runner(SyncConfig::default())
            .run(Box::new(backend.clone()))
            .await
            .unwrap();

        assert_eq!(report.scheduled, 1);
        assert_eq!(report.children, 1);
        let proposed = harness.service.proposed();
        assert_eq!(proposed.len(), 2);
        assert_eq!(proposed[0].safe, addr(C));
        assert_eq!(proposed[0].nonce, 0);
        assert_eq!(
            proposed[0].data,
            Some(approve_hash_calldata(&proposed[1].contract_transaction_hash))
        );
        assert!(proposed
            .iter()
            .all(|t| t.data != Some(approve_hash_calldata(&stale_hash))));

        assert_eq!(report.stale_children, vec![stale_path.clone()]);
        assert!(backend.get(&stale_path).is_none());
    }

    /// An unsubmitted child of an already submitted parent is still a real
    /// approval: it is scheduled on its own with its persisted nonce.
    #[tokio::test]
    async fn test_child_of_submitted_parent_is_scheduled() {
        let parent_hash = Hash::repeat_byte(0x77);
        let mut parent = pause_proposal(addr(P));
        parent.safe_tx_hash = Some(parent_hash);
        let child = child_file(addr(C), addr(P), parent_hash, 3);
        let child_path = child.0.clone();
        let (harness, backend) =
            nested_harness_with(vec![proposal_file("pause", &parent), child]);

        let report = harness
            .runner(SyncConfig::default())
            .run(Box::new(backend.clone()))
            .await
            .unwrap();

        assert_eq!(report.scheduled, 1);
        assert!(report.stale_children.is_empty());
        let proposed = harness.service.proposed();
        assert_eq!(proposed.len(), 1);
        assert_eq!(proposed[0].safe, addr(C));
        assert_eq!(proposed[0].nonce, 3);
        assert_eq!(proposed[0].data, Some(approve_hash_calldata(&parent_hash)));

        let child: Proposal = serde_json::from_str(&backend.get(&child_path).unwrap()).unwrap();
        assert_eq!(child.safe_tx_hash, Some(proposed[0].contract_transaction_hash));
    }

    // =========================================================================
    // FATAL PATHS
    // =========================================================================

    /// A and B own each other: the approval walk A -> B -> A fails before
    /// anything is proposed and the repository stays as it was.
    #[tokio::test]
    async fn test_ownership_cycle_aborts_run() {
        let (a_info, a_delegates) = safe_info(addr(A), 1, vec![addr(B)]);
        let (b_info, b_delegates) = safe_info(addr(B), 1, vec![addr(A)]);
        let mut harness = Harness::new(
            MockTransactionService::new()
                .with_safe(a_info, a_delegates)
                .with_safe(b_info, b_delegates),
        );
        harness.inspector = MockCodeInspector::with_contracts([addr(A), addr(B)]);
        let mut proposal = pause_proposal(addr(A));
        proposal.create_child_proposals = true;
        let backend = MemoryBackend::with_files([
            safe_file(addr(A), "alpha"),
            safe_file(addr(B), "beta"),
            proposal_file("pause", &proposal),
        ]);
        let before = snapshot(&backend);

        let err = harness
            .runner(SyncConfig::default())
            .run(Box::new(backend.clone()))
            .await
            .unwrap_err();

        match err {
            SyncError::Approval(ApprovalError::OwnershipCycle { path }) => {
                assert_eq!(path, vec![addr(A), addr(B), addr(A)]);
            }
            other => panic!("expected an ownership cycle, got {other}"),
        }
        assert!(harness.service.proposed().is_empty());
        assert_eq!(snapshot(&backend), before);
    }

    /// The delegate is not registered on the Safe: the run fails after the
    /// proposal's manifest is recorded and commits nothing.
    #[tokio::test]
    async fn test_unregistered_delegate_aborts_run() {
        let (info, _) = safe_info(addr(S), 1, vec![addr(0x01)]);
        let harness = Harness::new(MockTransactionService::new().with_safe(info, Vec::new()));
        let backend = MemoryBackend::with_files([
            safe_file(addr(S), "treasury"),
            proposal_file("pause", &pause_proposal(addr(S))),
        ]);
        let before = snapshot(&backend);
        let manifests = TempDir::new().unwrap();
        let config = SyncConfig {
            manifest_dir: Some(manifests.path().to_path_buf()),
            ..SyncConfig::default()
        };

        let err = harness
            .runner(config)
            .run(Box::new(backend.clone()))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SyncError::Authorization {
                source: AuthorizationError::DelegateNotRegistered { .. },
                ..
            }
        ));
        let manifest = fs::read_to_string(manifests.path().join("0.json")).unwrap();
        assert!(manifest.contains("proposals/pause.json"));
        assert!(manifest.contains("is not registered on Safe"));
        assert!(manifest.contains("\"submitted\": false"));
        assert!(harness.service.proposed().is_empty());
        assert_eq!(snapshot(&backend), before);
    }

    /// No delegate key loaded: same failure class, same untouched repository.
    #[tokio::test]
    async fn test_missing_signer_aborts_run() {
        let (info, delegates) = safe_info(addr(S), 1, vec![addr(0x01)]);
        let mut harness = Harness::new(MockTransactionService::new().with_safe(info, delegates));
        harness.signer = None;
        let backend = MemoryBackend::with_files([
            safe_file(addr(S), "treasury"),
            proposal_file("pause", &pause_proposal(addr(S))),
        ]);
        let before = snapshot(&backend);

        let err = harness
            .runner(SyncConfig::default())
            .run(Box::new(backend.clone()))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SyncError::Authorization {
                source: AuthorizationError::SignerNotLoaded { .. },
                ..
            }
        ));
        assert!(harness.service.proposed().is_empty());
        assert_eq!(snapshot(&backend), before);
    }
}
