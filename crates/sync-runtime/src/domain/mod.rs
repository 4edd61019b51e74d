//! Domain module for the sync runtime

pub mod manifest;
pub mod service;
pub mod simulation;

pub use manifest::{write_manifests, ManifestSimulation, ManifestTransaction, ProposalManifest};
pub use service::{
    DelegateRecord, Estimation, EstimationRequest, Page, PageRequest, ProposedTransaction,
    SafeInfo, SafeSnapshot, ServiceTransaction,
};
pub use simulation::{SimulatedCall, SimulationOutput, SimulationRequest, CALL_KIND};
