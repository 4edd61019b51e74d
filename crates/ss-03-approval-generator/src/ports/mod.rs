//! Ports for the Approval Generator

pub mod outbound;

pub use outbound::CodeInspector;
