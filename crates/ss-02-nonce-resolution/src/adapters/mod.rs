//! Adapters for Nonce Resolution

pub mod store;
