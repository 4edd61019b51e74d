//! Core domain entities for Nonce Resolution

use std::collections::BTreeMap;

use shared_types::{Address, NonceSpec};

use super::errors::NonceError;

/// Per-Safe counters, initialised from the Safe's transaction history the
/// first time a run references the Safe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonceCounters {
    pub safe: Address,
    /// Highest executed nonce + 1.
    pub nonce: u64,
    /// Highest known nonce + 1.
    pub pending_nonce: u64,
    /// Next automatic assignment.
    pub auto: u64,
    /// Nonces handed out this run, with the proposal that took each.
    claimed: BTreeMap<u64, String>,
}

impl NonceCounters {
    pub fn from_history(
        safe: Address,
        highest_executed: Option<u64>,
        highest: Option<u64>,
    ) -> Result<Self, NonceError> {
        let next = |n: Option<u64>| match n {
            Some(n) => n.checked_add(1).ok_or(NonceError::Exhausted { safe }),
            None => Ok(0),
        };
        let nonce = next(highest_executed)?;
        Ok(Self {
            safe,
            nonce,
            pending_nonce: next(highest)?,
            auto: nonce,
            claimed: BTreeMap::new(),
        })
    }

    /// Move the automatic cursor one slot forward.
    pub fn advance_auto(&mut self) -> Result<(), NonceError> {
        self.auto = self
            .auto
            .checked_add(1)
            .ok_or(NonceError::Exhausted { safe: self.safe })?;
        Ok(())
    }

    pub fn is_claimed(&self, nonce: u64) -> bool {
        self.claimed.contains_key(&nonce)
    }

    pub fn claimed_by(&self, nonce: u64) -> Option<&str> {
        self.claimed.get(&nonce).map(String::as_str)
    }

    /// Record `label` as the holder of `nonce`. Returns the existing holder
    /// instead if the nonce is already taken.
    pub fn claim(&mut self, nonce: u64, label: &str) -> Option<String> {
        if let Some(holder) = self.claimed.get(&nonce) {
            return Some(holder.clone());
        }
        self.claimed.insert(nonce, label.to_string());
        None
    }
}

/// A top-level proposal awaiting a nonce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonceCandidate {
    /// Proposal slot in the entity store.
    pub index: usize,
    /// Human-readable identity used in errors, normally the file path.
    pub label: String,
    pub safe: Address,
    pub nonce: Option<NonceSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledProposal {
    pub index: usize,
    pub label: String,
    pub nonce: u64,
}

/// One Safe's proposals in submission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafeSchedule {
    pub safe: Address,
    pub proposals: Vec<ScheduledProposal>,
}
