//! Application layer for Nonce Resolution

pub mod service;
