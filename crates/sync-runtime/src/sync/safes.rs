//! Safe state sync.
//!
//! Everything about one Safe is fetched before the store is touched, so a
//! retrieval failure part-way through leaves the Safe exactly as loaded.

use shared_types::{Address, Transaction};
use ss_01_entity_store::{transaction_path, EntityStore, StoreError};
use tracing::{debug, info};

use crate::domain::{Page, PageRequest, SafeSnapshot};
use crate::errors::ServiceError;
use crate::ports::TransactionService;

/// What applying one snapshot changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SafeSyncSummary {
    pub state_changed: bool,
    pub created: usize,
    pub updated: usize,
    /// Transactions whose status change moved them to a new path.
    pub relocated: usize,
}

async fn collect_pages<T, F, Fut>(mut fetch: F) -> Result<Vec<T>, ServiceError>
where
    F: FnMut(PageRequest) -> Fut,
    Fut: std::future::Future<Output = Result<Page<T>, ServiceError>>,
{
    let mut items = Vec::new();
    let mut page = PageRequest::first();
    loop {
        let batch = fetch(page).await?;
        let last = batch.is_last();
        let received = batch.results.len();
        items.extend(batch.results);
        if last {
            return Ok(items);
        }
        page = page.next(received);
    }
}

/// Fetch info, every delegate page and every transaction page of `safe`.
pub async fn fetch_snapshot(
    service: &dyn TransactionService,
    safe: Address,
) -> Result<SafeSnapshot, ServiceError> {
    let info = service.safe_info(safe).await?;
    let delegates = collect_pages(|page| service.delegates(safe, page)).await?;
    let transactions = collect_pages(|page| service.multisig_transactions(safe, page))
        .await?
        .into_iter()
        .map(Transaction::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    debug!(
        safe = %format!("{safe:#x}"),
        delegates = delegates.len(),
        transactions = transactions.len(),
        "Fetched Safe snapshot"
    );
    Ok(SafeSnapshot::new(info, delegates, transactions))
}

/// Write `snapshot` into the store.
///
/// Known transactions are rewritten in place, or relocated when their
/// status moved them to a different path; unknown ones are created.
pub fn apply_snapshot(
    store: &mut EntityStore,
    safe: Address,
    snapshot: SafeSnapshot,
) -> Result<SafeSyncSummary, StoreError> {
    let mut summary = SafeSyncSummary::default();

    if let Some((index, current)) = store
        .safe_by_address(&safe)
        .map(|e| (e.index, e.entity.clone()))
    {
        let next = current.clone().with_state(snapshot.state);
        if next != current {
            store.write_safe(index, Some(next))?;
            summary.state_changed = true;
        }
    }

    for tx in snapshot.transactions {
        let path = transaction_path(&tx);
        let known = store
            .transaction_by_hash(&tx.safe_tx_hash)
            .map(|e| (e.index, e.path.to_path_buf(), e.entity == &tx));
        match known {
            Some((_, _, true)) => {}
            Some((index, old_path, false)) if old_path == path => {
                store.write_transaction(index, Some(tx))?;
                summary.updated += 1;
            }
            Some((index, _, false)) => {
                store.unbind(index)?;
                store.create_transaction(path, tx)?;
                store.write_transaction(index, None)?;
                summary.relocated += 1;
            }
            None => {
                store.create_transaction(path, tx)?;
                summary.created += 1;
            }
        }
    }

    info!(
        safe = %format!("{safe:#x}"),
        state_changed = summary.state_changed,
        created = summary.created,
        updated = summary.updated,
        relocated = summary.relocated,
        "Synced Safe"
    );
    Ok(summary)
}
