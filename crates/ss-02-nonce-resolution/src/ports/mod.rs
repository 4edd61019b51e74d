//! Ports for Nonce Resolution

pub mod outbound;

pub use outbound::TransactionHistory;
