//! # On-Disk Runs
//!
//! The same pipeline against a repository in a temporary directory, checking
//! what lands in the files and in the manifest directory.

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use shared_types::{Proposal, Safe};
    use ss_01_entity_store::{safe_path, DiskBackend, EntityStore};
    use sync_runtime::ports::outbound::mocks::MockTransactionService;
    use sync_runtime::SyncConfig;
    use tempfile::TempDir;

    use crate::fixtures::*;

    const SAFE: u64 = 0x5a;

    fn write_repo(root: &Path, files: &[(std::path::PathBuf, String)]) {
        for (path, content) in files {
            let full = root.join(path);
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(full, content).unwrap();
        }
    }

    fn harness() -> Harness {
        let (info, delegates) = safe_info(addr(SAFE), 2, vec![addr(0x01), addr(0x02)]);
        let service = MockTransactionService::new()
            .with_safe(info, delegates)
            .with_transactions(addr(SAFE), vec![service_tx(addr(SAFE), 0, 0x10, true)]);
        Harness::new(service)
    }

    #[tokio::test]
    async fn test_run_writes_repository_and_manifests() {
        let repo = TempDir::new().unwrap();
        let manifests = TempDir::new().unwrap();
        write_repo(
            repo.path(),
            &[
                safe_file(addr(SAFE), "treasury"),
                proposal_file("pause", &pause_proposal(addr(SAFE))),
            ],
        );
        let harness = harness();
        let config = SyncConfig {
            root: repo.path().to_path_buf(),
            manifest_dir: Some(manifests.path().to_path_buf()),
            ..SyncConfig::default()
        };

        let report = harness
            .runner(config)
            .run(Box::new(DiskBackend::new(repo.path())))
            .await
            .unwrap();

        assert_eq!(report.submitted(), 1);
        assert_eq!(harness.service.proposed()[0].nonce, 1);

        let safe: Safe =
            serde_json::from_str(&fs::read_to_string(repo.path().join(safe_path("treasury"))).unwrap())
                .unwrap();
        assert_eq!(safe.threshold(), Some(2));
        assert!(safe.has_delegate(&delegate()));

        let proposal: Proposal =
            serde_json::from_str(&fs::read_to_string(repo.path().join("proposals/pause.json")).unwrap())
                .unwrap();
        assert_eq!(proposal.safe_tx_hash, report.manifests[0].safe_tx_hash);

        assert_eq!(report.manifest_files.len(), 1);
        let manifest = fs::read_to_string(&report.manifest_files[0]).unwrap();
        assert!(manifest.contains("\"submitted\": true"));

        let mut reloaded = EntityStore::new(Box::new(DiskBackend::new(repo.path())));
        let loaded = reloaded.load().unwrap();
        assert_eq!(loaded.safes, 1);
        assert_eq!(loaded.transactions, 1);
        assert_eq!(loaded.proposals, 1);
        assert_eq!(reloaded.highest_executed_nonce(&addr(SAFE)), Some(0));
    }

    #[tokio::test]
    async fn test_dry_run_leaves_files_alone() {
        let repo = TempDir::new().unwrap();
        write_repo(
            repo.path(),
            &[
                safe_file(addr(SAFE), "treasury"),
                proposal_file("pause", &pause_proposal(addr(SAFE))),
            ],
        );
        let before = fs::read_to_string(repo.path().join(safe_path("treasury"))).unwrap();
        let config = SyncConfig {
            root: repo.path().to_path_buf(),
            dry_run: true,
            ..SyncConfig::default()
        };

        let report = harness()
            .runner(config)
            .run(Box::new(DiskBackend::new(repo.path())))
            .await
            .unwrap();

        let diff = report.diff.as_deref().unwrap();
        assert!(diff.contains("+++ b/safes/treasury.json"));
        assert!(diff.contains("transactions/"));
        assert_eq!(
            fs::read_to_string(repo.path().join(safe_path("treasury"))).unwrap(),
            before
        );
        assert!(!repo.path().join("transactions").exists());
        assert!(report.summary().contains("Dry run"));
    }
}
