//! Simulator request and broadcast output.

use serde::{Deserialize, Serialize};
use shared_types::{Address, Bytes, FunctionCall, Operation, U256};
use ss_04_hash_verifier::PlannedCall;

use crate::domain::service::flexible_u256;

/// The only transaction type a Safe proposal may plan.
pub const CALL_KIND: &str = "CALL";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationRequest {
    /// The Safe the calls are simulated from.
    pub safe: Address,
    pub call: FunctionCall,
}

/// One transaction from the simulator's broadcast list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatedCall {
    #[serde(rename = "type")]
    pub kind: String,
    pub to: Address,
    #[serde(default, deserialize_with = "flexible_u256")]
    pub value: U256,
    #[serde(default)]
    pub data: Bytes,
}

impl SimulatedCall {
    pub fn is_call(&self) -> bool {
        self.kind.eq_ignore_ascii_case(CALL_KIND)
    }

    pub fn planned(&self) -> PlannedCall {
        PlannedCall {
            to: self.to,
            value: self.value,
            data: self.data.clone(),
            operation: Operation::Call,
        }
    }
}

/// What the simulator printed, with the command that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationOutput {
    pub command: String,
    pub output: String,
    pub calls: Vec<SimulatedCall>,
}

/// Broadcast document printed on the simulator's stdout.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Broadcast {
    pub transactions: Vec<SimulatedCall>,
}
