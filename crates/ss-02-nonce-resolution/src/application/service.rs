//! Nonce Resolver Service
//!
//! Owns the per-Safe counters for one sync run. Top-level proposals are
//! scheduled once, up front; child proposals draw from the same counters as
//! the approval generator discovers them.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use shared_types::{Address, NonceSpec};
use tracing::{debug, info, warn};

use crate::algorithms::{assign_auto, resolve_explicit};
use crate::config::NonceConfig;
use crate::domain::invariants::invariant_strictly_increasing;
use crate::domain::{NonceCandidate, NonceCounters, NonceError, SafeSchedule, ScheduledProposal};
use crate::ports::TransactionHistory;

pub struct NonceResolver {
    config: NonceConfig,
    counters: HashMap<Address, NonceCounters>,
}

fn counters_for<'m, H: TransactionHistory + ?Sized>(
    counters: &'m mut HashMap<Address, NonceCounters>,
    history: &H,
    safe: &Address,
) -> Result<&'m mut NonceCounters, NonceError> {
    match counters.entry(*safe) {
        Entry::Occupied(entry) => Ok(entry.into_mut()),
        Entry::Vacant(slot) => {
            let initial = NonceCounters::from_history(
                *safe,
                history.highest_executed_nonce(safe),
                history.highest_nonce(safe),
            )?;
            debug!(
                safe = %format!("{safe:#x}"),
                nonce = initial.nonce,
                pending_nonce = initial.pending_nonce,
                "Initialised nonce counters"
            );
            Ok(slot.insert(initial))
        }
    }
}

impl NonceResolver {
    pub fn new() -> Self {
        Self::with_config(NonceConfig::default())
    }

    pub fn with_config(config: NonceConfig) -> Self {
        Self {
            config,
            counters: HashMap::new(),
        }
    }

    /// Counters of `safe`, initialised from `history` on first reference.
    pub fn counters<H: TransactionHistory + ?Sized>(
        &mut self,
        history: &H,
        safe: &Address,
    ) -> Result<&NonceCounters, NonceError> {
        counters_for(&mut self.counters, history, safe).map(|c| &*c)
    }

    /// Assign nonces to every candidate and group them per Safe.
    ///
    /// Safes appear in order of their first candidate; each Safe's
    /// proposals are sorted by nonce. Explicit nonces are resolved before
    /// automatic ones, so automatic assignment never lands on a value an
    /// explicit proposal already took.
    pub fn schedule<H: TransactionHistory + ?Sized>(
        &mut self,
        history: &H,
        candidates: Vec<NonceCandidate>,
    ) -> Result<Vec<SafeSchedule>, NonceError> {
        let mut order: Vec<Address> = Vec::new();
        let mut grouped: HashMap<Address, Vec<NonceCandidate>> = HashMap::new();
        for candidate in candidates {
            let safe = candidate.safe;
            grouped
                .entry(safe)
                .or_insert_with(|| {
                    order.push(safe);
                    Vec::new()
                })
                .push(candidate);
        }

        let mut schedules = Vec::with_capacity(order.len());
        for safe in order {
            let group = grouped.remove(&safe).unwrap_or_default();
            let counters = counters_for(&mut self.counters, history, &safe)?;
            let mut explicit: Vec<(NonceSpec, NonceCandidate)> = Vec::new();
            let mut implicit: Vec<NonceCandidate> = Vec::new();
            for mut candidate in group {
                match candidate.nonce.take() {
                    Some(spec) => explicit.push((spec, candidate)),
                    None => implicit.push(candidate),
                }
            }

            let mut proposals = Vec::with_capacity(explicit.len() + implicit.len());
            for (spec, candidate) in explicit {
                let nonce = resolve_explicit(counters, &candidate.label, &spec, &self.config)?;
                if let Some(first) = counters.claim(nonce, &candidate.label) {
                    return Err(NonceError::DuplicateNonce {
                        safe,
                        nonce,
                        first,
                        second: candidate.label,
                    });
                }
                proposals.push(ScheduledProposal {
                    index: candidate.index,
                    label: candidate.label,
                    nonce,
                });
            }
            for candidate in implicit {
                let nonce = assign_auto(counters, &candidate.label)?;
                proposals.push(ScheduledProposal {
                    index: candidate.index,
                    label: candidate.label,
                    nonce,
                });
            }

            proposals.sort_by_key(|p| p.nonce);
            debug_assert!(invariant_strictly_increasing(&proposals));

            info!(
                safe = %format!("{safe:#x}"),
                proposals = proposals.len(),
                first_nonce = proposals.first().map(|p| p.nonce),
                "Scheduled proposals"
            );
            schedules.push(SafeSchedule { safe, proposals });
        }

        Ok(schedules)
    }

    /// Nonce for a generated child proposal on `safe`.
    ///
    /// A child regenerated from an earlier run keeps the nonce persisted in
    /// its file; a new child takes the next automatic slot.
    pub fn resolve_child<H: TransactionHistory + ?Sized>(
        &mut self,
        history: &H,
        safe: &Address,
        label: &str,
        persisted: Option<&NonceSpec>,
    ) -> Result<u64, NonceError> {
        let counters = counters_for(&mut self.counters, history, safe)?;
        let nonce = match persisted {
            Some(spec) => {
                let nonce = resolve_explicit(counters, label, spec, &self.config)?;
                if let Some(holder) = counters.claim(nonce, label) {
                    warn!(
                        safe = %format!("{safe:#x}"),
                        nonce,
                        child = label,
                        holder = %holder,
                        "Child proposal shares its nonce with another proposal"
                    );
                }
                nonce
            }
            None => assign_auto(counters, label)?,
        };
        debug!(safe = %format!("{safe:#x}"), nonce, child = label, "Resolved child nonce");
        Ok(nonce)
    }
}

impl Default for NonceResolver {
    fn default() -> Self {
        Self::new()
    }
}
