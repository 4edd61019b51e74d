//! Ports for the Hash Verifier

pub mod outbound;

pub use outbound::SafeContract;
