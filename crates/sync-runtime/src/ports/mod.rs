//! Ports for the sync runtime

pub mod outbound;

pub use outbound::{DelegateSigner, Notifier, Simulator, TransactionService};
