//! Domain invariants for Nonce Resolution

use super::entities::ScheduledProposal;

/// INVARIANT-1: a Safe's schedule is strictly increasing, so submissions
/// happen in contract execution order and no two proposals share a nonce.
pub fn invariant_strictly_increasing(schedule: &[ScheduledProposal]) -> bool {
    schedule.windows(2).all(|w| w[0].nonce < w[1].nonce)
}
