//! Algorithms module for Nonce Resolution
//!
//! Contains:
//! - The nonce formula parser and evaluator
//! - The two-pass per-Safe assignment

pub mod assignment;
pub mod expression;

pub use assignment::{assign_auto, resolve_explicit};
pub use expression::{Binding, Bindings, Expr};
