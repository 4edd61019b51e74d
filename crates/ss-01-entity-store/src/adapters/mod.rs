//! Adapters for the Entity Store backend port

pub mod disk;
pub mod memory;

pub use disk::DiskBackend;
pub use memory::MemoryBackend;
