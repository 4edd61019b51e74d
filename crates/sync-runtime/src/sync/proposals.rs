//! Proposal sync.
//!
//! One proposal with a resolved nonce goes through:
//!
//! ```text
//! plan calls ──→ batch ──→ estimate ──→ verify hash ──→ children (depth-first)
//!     │                       │                               │
//!  simulator             recoverable                    dry run stops
//!                                                             │
//!                authorize ──→ sign ──→ propose ──→ write back ──→ notify
//! ```
//!
//! Recoverable failures end up in the proposal's manifest and skip the rest
//! of the procedure. Every other failure aborts the run.

use std::path::PathBuf;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use shared_types::{
    Address, FunctionCall, Hash, NotificationState, Operation, Proposal, ProposalAction, Safe,
    U256,
};
use ss_03_approval_generator::{ApprovalPath, ChildOutcome, ParentContext};
use ss_04_hash_verifier::abi::{approve_hash_calldata, multi_send};
use ss_04_hash_verifier::{PlannedCall, SafeTxData};
use sync_telemetry::metrics::outcome;
use tracing::{debug, info, warn};

use super::{RunContext, RunState};
use crate::domain::{ManifestSimulation, ProposalManifest, ProposedTransaction, SimulationRequest};
use crate::errors::{AuthorizationError, SimulationError, SyncError};
use crate::ports::DelegateSigner;

/// Notification text for a submitted proposal.
pub fn render_notification(
    safe: &Safe,
    path: &std::path::Path,
    proposal: &Proposal,
    nonce: u64,
    safe_tx_hash: &Hash,
) -> String {
    let mut body = format!(
        "New proposal for *{}* ({:#x})\nFile: `{}`\nNonce: {nonce}\nsafeTxHash: `{safe_tx_hash:#x}`",
        safe.name(),
        safe.address(),
        path.display(),
    );
    if let Some(threshold) = safe.threshold() {
        body.push_str(&format!("\nSignatures required: {threshold}"));
    }
    if let Some(description) = proposal.description.as_deref().filter(|d| !d.trim().is_empty()) {
        body.push_str("\n\n");
        body.push_str(description.trim());
    }
    body
}

fn finish(state: &mut RunState, ctx: &RunContext<'_>, manifest: ProposalManifest, label: &str) {
    ctx.metrics.record_proposal(label);
    state.manifests.push(manifest);
}

/// Record a recoverable failure and move on, or hand back a fatal one.
fn recover(
    state: &mut RunState,
    ctx: &RunContext<'_>,
    mut manifest: ProposalManifest,
    err: SyncError,
) -> Result<(), SyncError> {
    if !err.is_recoverable() {
        manifest.error = Some(err.to_string());
        state.manifests.push(manifest);
        return Err(err);
    }
    warn!(
        proposal = %manifest.proposal_path.display(),
        error = %err,
        "Proposal skipped for this run"
    );
    manifest.error = Some(err.to_string());
    finish(state, ctx, manifest, outcome::FAILED);
    Ok(())
}

async fn plan_calls(
    ctx: &RunContext<'_>,
    manifest: &mut ProposalManifest,
    safe: Address,
    call: &FunctionCall,
) -> Result<Vec<PlannedCall>, SyncError> {
    let request = SimulationRequest {
        safe,
        call: call.clone(),
    };
    let output = ctx.parts.simulator.simulate(&request).await?;
    manifest.simulation = Some(ManifestSimulation {
        command: output.command.clone(),
        output: output.output.clone(),
    });
    if let Some(other) = output.calls.iter().find(|c| !c.is_call()) {
        return Err(SyncError::UnsupportedCall {
            proposal: manifest.proposal_path.clone(),
            kind: other.kind.clone(),
        });
    }
    if output.calls.is_empty() {
        return Err(SimulationError::MissingOutput.into());
    }
    Ok(output.calls.iter().map(|c| c.planned()).collect())
}

fn approve_parent(parent_safe: Address, parent_hash: &Hash) -> PlannedCall {
    PlannedCall {
        to: parent_safe,
        value: U256::zero(),
        data: approve_hash_calldata(parent_hash),
        operation: Operation::Call,
    }
}

/// The signer allowed to submit for `delegate` on `safe`.
fn authorize<'c>(
    ctx: &'c RunContext<'_>,
    safe: &Safe,
    delegate: Address,
) -> Result<&'c Arc<dyn DelegateSigner>, AuthorizationError> {
    if !safe.has_delegate(&delegate) {
        return Err(AuthorizationError::DelegateNotRegistered {
            safe: safe.address(),
            delegate,
        });
    }
    let signer = ctx
        .parts
        .signer
        .as_ref()
        .ok_or_else(|| AuthorizationError::SignerNotLoaded {
            env: ctx.config.delegate_key_env.clone(),
        })?;
    if signer.address() != delegate {
        return Err(AuthorizationError::SignerMismatch {
            expected: delegate,
            actual: signer.address(),
        });
    }
    Ok(signer)
}

/// Sync the proposal in slot `index` with the already resolved `nonce`.
/// Approval children it spawns are synced depth-first before it is submitted.
pub fn sync_proposal<'a>(
    ctx: &'a RunContext<'a>,
    state: &'a mut RunState,
    approval_path: &'a mut ApprovalPath,
    index: usize,
    nonce: u64,
) -> BoxFuture<'a, Result<(), SyncError>> {
    async move {
        let Some((path, proposal)) = state
            .store
            .proposal(index)
            .map(|e| (e.path.to_path_buf(), e.entity.clone()))
        else {
            return Ok(());
        };
        if proposal.is_submitted() {
            debug!(proposal = %path.display(), "Already submitted");
            ctx.metrics.record_proposal(outcome::SKIPPED);
            return Ok(());
        }

        approval_path.enter(proposal.safe)?;
        let result = sync_entered(ctx, state, approval_path, index, nonce, path, proposal).await;
        approval_path.leave();
        result
    }
    .boxed()
}

async fn sync_entered(
    ctx: &RunContext<'_>,
    state: &mut RunState,
    approval_path: &mut ApprovalPath,
    index: usize,
    nonce: u64,
    path: PathBuf,
    proposal: Proposal,
) -> Result<(), SyncError> {
    let safe = state
        .store
        .safe_by_address(&proposal.safe)
        .map(|e| e.entity.clone())
        .ok_or_else(|| SyncError::MissingSafe {
            proposal: path.clone(),
            safe: proposal.safe,
        })?;
    let safe_address = safe.address();
    let mut manifest = ProposalManifest::new(path.clone(), proposal.clone(), nonce);
    info!(
        proposal = %path.display(),
        safe = %format!("{safe_address:#x}"),
        nonce,
        "Syncing proposal"
    );

    let planned = match &proposal.action {
        ProposalAction::Call(call) => {
            match plan_calls(ctx, &mut manifest, safe_address, call).await {
                Ok(planned) => planned,
                Err(err) => return recover(state, ctx, manifest, err),
            }
        }
        ProposalAction::ChildOf(parent) => vec![approve_parent(parent.safe, &parent.hash)],
    };
    let call = match planned.as_slice() {
        [single] => single.clone(),
        calls => multi_send(ctx.config.multi_send, calls),
    };

    let mut tx = SafeTxData::new(call.to, call.value, call.data, call.operation, nonce);
    manifest.transaction = Some((&tx).into());
    match ctx.parts.service.estimate(safe_address, &tx).await {
        Ok(gas) => {
            tx.safe_tx_gas = gas;
            manifest.estimation = Some(gas);
            manifest.transaction = Some((&tx).into());
        }
        Err(err) => return recover(state, ctx, manifest, err.into()),
    }

    let verified = match ctx.parts.verifier.verify(safe_address, safe.version(), &tx).await {
        Ok(verified) => verified,
        Err(err) => return recover(state, ctx, manifest, err.into()),
    };
    let hash = verified.safe_tx_hash;
    manifest.safe_tx_hash = Some(hash);
    manifest.message_hash = Some(verified.message_hash);

    if proposal.create_child_proposals {
        let parent = ParentContext {
            path: path.clone(),
            proposal: proposal.clone(),
            safe: safe_address,
            safe_name: safe.name().to_string(),
            owners: safe.owners().to_vec(),
            safe_tx_hash: hash,
        };
        sync_children(ctx, state, approval_path, &parent).await?;
    }

    if ctx.config.dry_run {
        info!(
            proposal = %path.display(),
            safe_tx_hash = %format!("{hash:#x}"),
            "Dry run: not submitting"
        );
        finish(state, ctx, manifest, outcome::DRY_RUN);
        return Ok(());
    }

    let signer = match authorize(ctx, &safe, proposal.delegate) {
        Ok(signer) => signer,
        Err(source) => {
            let err = SyncError::Authorization {
                proposal: path.clone(),
                source,
            };
            return recover(state, ctx, manifest, err);
        }
    };
    let signature = match signer.sign_hash(&hash) {
        Ok(signature) => signature,
        Err(err) => return recover(state, ctx, manifest, err.into()),
    };
    let body = ProposedTransaction::new(
        safe_address,
        &tx,
        hash,
        signer.address(),
        signature,
        ctx.config.origin.clone(),
    );
    if let Err(err) = ctx.parts.service.propose(&body).await {
        return recover(state, ctx, manifest, err.into());
    }

    info!(
        proposal = %path.display(),
        safe = %format!("{safe_address:#x}"),
        nonce,
        safe_tx_hash = %format!("{hash:#x}"),
        "Proposal submitted"
    );
    manifest.submitted = true;
    let mut updated = proposal;
    updated.safe_tx_hash = Some(hash);
    notify(ctx, &safe, &path, &mut updated, nonce, &hash).await;
    state.store.write_proposal(index, Some(updated))?;
    finish(state, ctx, manifest, outcome::SUBMITTED);
    Ok(())
}

/// Prepare and sync the approval child of every owner, depth-first, before
/// the parent itself is submitted.
async fn sync_children(
    ctx: &RunContext<'_>,
    state: &mut RunState,
    approval_path: &mut ApprovalPath,
    parent: &ParentContext,
) -> Result<(), SyncError> {
    for (position, owner) in parent.owners.iter().copied().enumerate() {
        let outcome = ctx
            .parts
            .approvals
            .prepare_child(&mut state.store, &mut state.resolver, parent, position, owner)
            .await?;
        if let ChildOutcome::Prepared(child) = outcome {
            ctx.metrics.children_generated.inc();
            state.children += 1;
            sync_proposal(ctx, state, approval_path, child.index, child.nonce).await?;
        }
    }
    Ok(())
}

/// Post or update the proposal's message on every channel of its Safe.
/// Failures are logged and leave the stored message id untouched.
async fn notify(
    ctx: &RunContext<'_>,
    safe: &Safe,
    path: &std::path::Path,
    proposal: &mut Proposal,
    nonce: u64,
    hash: &Hash,
) {
    let Some(targets) = safe.notify() else {
        return;
    };
    let body = render_notification(safe, path, proposal, nonce, hash);
    for channel in &targets.channels {
        let previous = proposal
            .notifications
            .iter()
            .find(|n| &n.channel == channel)
            .and_then(|n| n.message_id.clone());
        match ctx
            .parts
            .notifier
            .notify(channel, &body, previous.as_deref())
            .await
        {
            Ok(message_id) => {
                match proposal.notifications.iter_mut().find(|n| &n.channel == channel) {
                    Some(state) => state.message_id = Some(message_id),
                    None => proposal.notifications.push(NotificationState {
                        channel: channel.clone(),
                        message_id: Some(message_id),
                    }),
                }
            }
            Err(err) => warn!(channel = %channel, error = %err, "Notification failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::NotifyTargets;

    #[test]
    fn test_render_notification() {
        let safe = match Safe::bare(Address::from_low_u64_be(1), "treasury") {
            Safe::Bare(mut bare) => {
                bare.notify = Some(NotifyTargets {
                    channels: vec!["#ops".to_string()],
                });
                Safe::Bare(bare)
            }
            other => other,
        };
        let proposal = Proposal {
            safe: safe.address(),
            delegate: Address::from_low_u64_be(9),
            nonce: None,
            safe_tx_hash: None,
            description: Some("Rotate the oracle\n\nDetails follow.".to_string()),
            create_child_proposals: false,
            notifications: Vec::new(),
            action: ProposalAction::Call(FunctionCall {
                contract: Address::from_low_u64_be(3),
                function: "rotate()".to_string(),
                args: Vec::new(),
                value: U256::zero(),
            }),
        };
        let body = render_notification(
            &safe,
            std::path::Path::new("proposals/rotate.json"),
            &proposal,
            4,
            &Hash::repeat_byte(0xcd),
        );
        assert!(body.starts_with("New proposal for *treasury*"));
        assert!(body.contains("Nonce: 4"));
        assert!(body.contains(&format!("0x{}", "cd".repeat(32))));
        assert!(body.ends_with("Details follow."));
        assert!(!body.contains("Signatures required"));
    }
}
