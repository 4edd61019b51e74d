//! End-to-end runs of the sync pipeline.

pub mod disk;
pub mod scenarios;
