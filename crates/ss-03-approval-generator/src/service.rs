//! # Approval Generator Service
//!
//! For one owner of a submitted parent proposal, decide whether the owner
//! can approve on-chain through the parent's delegate and, if so, write the
//! `childOf` proposal that does it.
//!
//! The caller walks the owners in order and runs the full proposal sync on
//! each prepared child before moving to the next owner, so grandchildren
//! are hashed before siblings are considered.

use shared_types::{Address, NonceSpec, ParentRef, Proposal, ProposalAction};
use ss_01_entity_store::{child_proposal_path, EntityStore};
use ss_02_nonce_resolution::NonceResolver;
use tracing::{debug, info};

use crate::config::ApprovalConfig;
use crate::domain::{ApprovalError, ApprovalPath, ChildOutcome, ParentContext, PreparedChild, SkipReason};
use crate::ports::CodeInspector;

pub struct ApprovalGenerator<I: CodeInspector> {
    inspector: I,
    config: ApprovalConfig,
}

fn describe(parent: &ParentContext) -> String {
    let mut description = format!(
        "Approve safeTxHash {:#x} on Safe {} ({:#x}).\n\nParent proposal: {}",
        parent.safe_tx_hash,
        parent.safe_name,
        parent.safe,
        parent.path.display()
    );
    if let Some(summary) = parent
        .proposal
        .description
        .as_deref()
        .and_then(|d| d.lines().next())
        .filter(|l| !l.trim().is_empty())
    {
        description.push_str("\nParent description: ");
        description.push_str(summary.trim());
    }
    description
}

impl<I: CodeInspector> ApprovalGenerator<I> {
    pub fn new(inspector: I, config: ApprovalConfig) -> Self {
        Self { inspector, config }
    }

    /// A fresh recursion guard for one top-level proposal.
    pub fn path(&self) -> ApprovalPath {
        ApprovalPath::new(self.config.max_depth)
    }

    /// Prepare the child proposal for owner `position` of the parent Safe.
    ///
    /// Re-running against an existing child updates it in place. A child
    /// already submitted keeps its safeTxHash, notification state and nonce.
    pub async fn prepare_child(
        &self,
        store: &mut EntityStore,
        resolver: &mut NonceResolver,
        parent: &ParentContext,
        position: usize,
        owner: Address,
    ) -> Result<ChildOutcome, ApprovalError> {
        if !self.inspector.has_code(owner).await? {
            debug!(owner = %format!("{owner:#x}"), "Owner is externally owned");
            return Ok(ChildOutcome::Skipped(SkipReason::ExternallyOwned));
        }

        let delegate = parent.proposal.delegate;
        let registered = match store.safe_by_address(&owner) {
            None => {
                debug!(owner = %format!("{owner:#x}"), "Owner is not a monitored Safe");
                return Ok(ChildOutcome::Skipped(SkipReason::Unmonitored));
            }
            Some(entry) => entry.entity.has_delegate(&delegate),
        };
        if !registered {
            debug!(
                owner = %format!("{owner:#x}"),
                delegate = %format!("{delegate:#x}"),
                "Delegate not registered on owner Safe"
            );
            return Ok(ChildOutcome::Skipped(SkipReason::DelegateNotRegistered));
        }

        let path = child_proposal_path(&parent.path, &parent.safe_tx_hash, position);
        let existing = store
            .child_proposal(&parent.safe_tx_hash, position)
            .or_else(|| store.proposal_by_path(&path))
            .map(|e| (e.index, e.path.to_path_buf(), e.entity.clone()));

        let mut child = Proposal {
            safe: owner,
            delegate,
            nonce: None,
            safe_tx_hash: None,
            description: Some(describe(parent)),
            create_child_proposals: parent.proposal.create_child_proposals,
            notifications: Vec::new(),
            action: ProposalAction::ChildOf(ParentRef {
                safe: parent.safe,
                hash: parent.safe_tx_hash,
                position,
            }),
        };
        if let Some((_, _, previous)) = &existing {
            child.safe_tx_hash = previous.safe_tx_hash;
            child.notifications = previous.notifications.clone();
        }

        let child_path = existing
            .as_ref()
            .map_or_else(|| path.clone(), |(_, p, _)| p.clone());
        let label = child_path.display().to_string();
        let persisted = existing.as_ref().and_then(|(_, _, p)| p.nonce.clone());
        let nonce = resolver.resolve_child(&*store, &owner, &label, persisted.as_ref())?;
        child.nonce = Some(NonceSpec::Literal(nonce));

        let (index, created) = match existing {
            Some((index, _, _)) => {
                store.write_proposal(index, Some(child))?;
                (index, false)
            }
            None => (store.create_proposal(child_path.clone(), child)?, true),
        };

        info!(
            parent = %format!("{:#x}", parent.safe_tx_hash),
            owner = %format!("{owner:#x}"),
            position,
            nonce,
            created,
            path = %label,
            "Prepared approval proposal"
        );
        Ok(ChildOutcome::Prepared(PreparedChild {
            index,
            path: child_path,
            safe: owner,
            nonce,
            created,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::outbound::mocks::MockCodeInspector;
    use shared_types::{Delegate, FunctionCall, Hash, Safe, SafeState, U256};
    use ss_01_entity_store::{safe_path, MemoryBackend};
    use std::path::PathBuf;

    fn addr(n: u64) -> Address {
        Address::from_low_u64_be(n)
    }

    const PARENT: u64 = 0x10;
    const OWNER_SAFE: u64 = 0x20;
    const OWNER_EOA: u64 = 0x30;
    const OWNER_UNKNOWN: u64 = 0x40;
    const OWNER_NO_DELEGATE: u64 = 0x50;
    const DELEGATE: u64 = 0x99;

    fn populated(address: Address, name: &str, owners: Vec<Address>, delegates: Vec<Address>) -> Safe {
        Safe::bare(address, name).with_state(SafeState {
            owners,
            delegates: delegates
                .into_iter()
                .map(|d| Delegate {
                    delegate: d,
                    delegator: addr(1),
                    label: String::new(),
                })
                .collect(),
            threshold: 1,
            nonce: 0,
            version: "1.3.0".to_string(),
        })
    }

    fn setup() -> (EntityStore, ParentContext) {
        let mut store = EntityStore::new(Box::new(MemoryBackend::new()));
        let owners = vec![
            addr(OWNER_EOA),
            addr(OWNER_SAFE),
            addr(OWNER_UNKNOWN),
            addr(OWNER_NO_DELEGATE),
        ];
        store
            .create_safe(safe_path("parent"), populated(addr(PARENT), "parent", owners.clone(), vec![addr(DELEGATE)]))
            .unwrap();
        store
            .create_safe(safe_path("council"), populated(addr(OWNER_SAFE), "council", vec![addr(2)], vec![addr(DELEGATE)]))
            .unwrap();
        store
            .create_safe(safe_path("other"), populated(addr(OWNER_NO_DELEGATE), "other", vec![addr(2)], vec![addr(7)]))
            .unwrap();

        let proposal = Proposal {
            safe: addr(PARENT),
            delegate: addr(DELEGATE),
            nonce: None,
            safe_tx_hash: Some(Hash::repeat_byte(0xab)),
            description: Some("Upgrade the vault\nmore detail".to_string()),
            create_child_proposals: true,
            notifications: Vec::new(),
            action: ProposalAction::Call(FunctionCall {
                contract: addr(3),
                function: "upgrade()".to_string(),
                args: Vec::new(),
                value: U256::zero(),
            }),
        };
        let path = PathBuf::from("proposals/vault/upgrade.json");
        store.create_proposal(path.clone(), proposal.clone()).unwrap();

        let parent = ParentContext {
            path,
            proposal,
            safe: addr(PARENT),
            safe_name: "parent".to_string(),
            owners,
            safe_tx_hash: Hash::repeat_byte(0xab),
        };
        (store, parent)
    }

    fn generator() -> ApprovalGenerator<MockCodeInspector> {
        ApprovalGenerator::new(
            MockCodeInspector::with_contracts([
                addr(PARENT),
                addr(OWNER_SAFE),
                addr(OWNER_UNKNOWN),
                addr(OWNER_NO_DELEGATE),
            ]),
            ApprovalConfig::default(),
        )
    }

    async fn run_all(
        generator: &ApprovalGenerator<MockCodeInspector>,
        store: &mut EntityStore,
        resolver: &mut NonceResolver,
        parent: &ParentContext,
    ) -> Vec<ChildOutcome> {
        let mut outcomes = Vec::new();
        for (position, owner) in parent.owners.iter().enumerate() {
            outcomes.push(
                generator
                    .prepare_child(store, resolver, parent, position, *owner)
                    .await
                    .unwrap(),
            );
        }
        outcomes
    }

    #[tokio::test]
    async fn test_only_delegated_safe_owner_gets_child() {
        let (mut store, parent) = setup();
        let mut resolver = NonceResolver::new();
        let outcomes = run_all(&generator(), &mut store, &mut resolver, &parent).await;

        assert_eq!(outcomes[0], ChildOutcome::Skipped(SkipReason::ExternallyOwned));
        assert_eq!(outcomes[2], ChildOutcome::Skipped(SkipReason::Unmonitored));
        assert_eq!(
            outcomes[3],
            ChildOutcome::Skipped(SkipReason::DelegateNotRegistered)
        );

        let ChildOutcome::Prepared(child) = &outcomes[1] else {
            panic!("expected a child for the council Safe");
        };
        assert_eq!(child.safe, addr(OWNER_SAFE));
        assert_eq!(child.nonce, 0);
        assert!(child.created);
        assert_eq!(
            child.path,
            PathBuf::from(format!("proposals/vault/{:#x}.1.child.json", Hash::repeat_byte(0xab)))
        );

        let entry = store.proposal(child.index).unwrap();
        let proposal = entry.entity;
        assert_eq!(proposal.delegate, addr(DELEGATE));
        assert_eq!(
            proposal.parent(),
            Some(&ParentRef {
                safe: addr(PARENT),
                hash: Hash::repeat_byte(0xab),
                position: 1,
            })
        );
        let description = proposal.description.as_deref().unwrap();
        assert!(description.contains("proposals/vault/upgrade.json"));
        assert!(description.contains("Upgrade the vault"));
        assert!(!description.contains("more detail"));
        assert_eq!(proposal.nonce, Some(NonceSpec::Literal(0)));
        assert_eq!(store.proposals().filter(|p| p.entity.is_child()).count(), 1);
    }

    #[tokio::test]
    async fn test_regeneration_updates_in_place() {
        let (mut store, parent) = setup();
        let generator = generator();

        let mut resolver = NonceResolver::new();
        let first = generator
            .prepare_child(&mut store, &mut resolver, &parent, 1, addr(OWNER_SAFE))
            .await
            .unwrap();
        let ChildOutcome::Prepared(first) = first else {
            panic!("expected child");
        };

        // Simulate submission, then a fresh run.
        let mut submitted = store.proposal(first.index).unwrap().entity.clone();
        submitted.safe_tx_hash = Some(Hash::repeat_byte(0xcd));
        store.write_proposal(first.index, Some(submitted)).unwrap();

        let mut next_run = NonceResolver::new();
        let second = generator
            .prepare_child(&mut store, &mut next_run, &parent, 1, addr(OWNER_SAFE))
            .await
            .unwrap();
        let ChildOutcome::Prepared(second) = second else {
            panic!("expected child");
        };

        assert_eq!(second.index, first.index);
        assert_eq!(second.path, first.path);
        assert_eq!(second.nonce, first.nonce);
        assert!(!second.created);
        assert_eq!(store.proposals().filter(|p| p.entity.is_child()).count(), 1);
        assert_eq!(
            store.proposal(second.index).unwrap().entity.safe_tx_hash,
            Some(Hash::repeat_byte(0xcd))
        );
    }

    #[tokio::test]
    async fn test_children_advance_owner_counters() {
        let (mut store, parent) = setup();
        let generator = generator();
        let mut resolver = NonceResolver::new();
        resolver
            .schedule(
                &store,
                vec![ss_02_nonce_resolution::NonceCandidate {
                    index: 99,
                    label: "proposals/council.json".to_string(),
                    safe: addr(OWNER_SAFE),
                    nonce: None,
                }],
            )
            .unwrap();

        let outcome = generator
            .prepare_child(&mut store, &mut resolver, &parent, 1, addr(OWNER_SAFE))
            .await
            .unwrap();
        let ChildOutcome::Prepared(child) = outcome else {
            panic!("expected child");
        };
        assert_eq!(child.nonce, 1);
    }
}
