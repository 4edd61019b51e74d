//! Adapters for the sync runtime's outbound ports
//!
//! - `tx_service`: transaction service over HTTP
//! - `rpc`: JSON-RPC client backing `SafeContract` and `CodeInspector`
//! - `simulator`: external simulator subprocess
//! - `signer`: local delegate key
//! - `notifier`: log and webhook notification channels

pub mod notifier;
pub mod rpc;
pub mod signer;
pub mod simulator;
pub mod tx_service;

pub use notifier::{LogNotifier, WebhookNotifier};
pub use rpc::JsonRpcClient;
pub use signer::LocalKeySigner;
pub use simulator::CommandSimulator;
pub use tx_service::HttpTransactionService;
