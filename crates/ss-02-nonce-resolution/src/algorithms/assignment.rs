//! Nonce assignment against a Safe's counters.

use shared_types::NonceSpec;

use super::expression::{Bindings, Expr};
use crate::config::NonceConfig;
use crate::domain::{NonceCounters, NonceError};

fn bindings(counters: &NonceCounters) -> Bindings {
    Bindings {
        auto: counters.auto,
        nonce: counters.nonce,
        pending_nonce: counters.pending_nonce,
    }
}

/// Resolve an explicit nonce field.
///
/// Text that parses as an integer is taken literally. Anything else is a
/// formula; a formula that reads `auto` and lands exactly on the cursor
/// consumes that automatic slot.
pub fn resolve_explicit(
    counters: &mut NonceCounters,
    label: &str,
    spec: &NonceSpec,
    config: &NonceConfig,
) -> Result<u64, NonceError> {
    let text = match spec {
        NonceSpec::Literal(n) => return Ok(*n),
        NonceSpec::Expression(text) => text,
    };
    if let Ok(n) = text.trim().parse::<u64>() {
        return Ok(n);
    }

    let invalid = |source| NonceError::InvalidExpression {
        proposal: label.to_string(),
        expression: text.clone(),
        source,
    };
    let expr = Expr::parse(text, config).map_err(invalid)?;
    let value = expr.evaluate(&bindings(counters)).map_err(invalid)?;

    if expr.references_auto() && value == counters.auto {
        counters.advance_auto()?;
    }
    Ok(value)
}

/// Take the next unclaimed automatic nonce for `label`.
pub fn assign_auto(counters: &mut NonceCounters, label: &str) -> Result<u64, NonceError> {
    while counters.is_claimed(counters.auto) {
        counters.advance_auto()?;
    }
    let nonce = counters.auto;
    counters.claim(nonce, label);
    counters.advance_auto()?;
    Ok(nonce)
}
