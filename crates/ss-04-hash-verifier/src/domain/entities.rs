//! Core domain entities for the Hash Verifier

use shared_types::{Address, Bytes, Hash, Operation, Transaction, U256};

/// The ten parameters a Safe hashes and executes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafeTxData {
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
    pub operation: Operation,
    pub safe_tx_gas: U256,
    pub base_gas: U256,
    pub gas_price: U256,
    pub gas_token: Address,
    pub refund_receiver: Address,
    pub nonce: u64,
}

impl SafeTxData {
    /// A transaction with no gas refund settings.
    pub fn new(to: Address, value: U256, data: Bytes, operation: Operation, nonce: u64) -> Self {
        Self {
            to,
            value,
            data,
            operation,
            safe_tx_gas: U256::zero(),
            base_gas: U256::zero(),
            gas_price: U256::zero(),
            gas_token: Address::zero(),
            refund_receiver: Address::zero(),
            nonce,
        }
    }
}

impl From<&Transaction> for SafeTxData {
    fn from(tx: &Transaction) -> Self {
        Self {
            to: tx.to,
            value: tx.value,
            data: tx.data.clone(),
            operation: tx.operation,
            safe_tx_gas: tx.safe_tx_gas,
            base_gas: tx.base_gas,
            gas_price: tx.gas_price,
            gas_token: tx.gas_token,
            refund_receiver: tx.refund_receiver,
            nonce: tx.nonce,
        }
    }
}

/// One call a proposal plans to make.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedCall {
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
    pub operation: Operation,
}

/// Result of a successful verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifiedHash {
    /// The hash owners sign; agreed on by local computation and the contract.
    pub safe_tx_hash: Hash,
    /// The SafeTx struct hash, kept for audit and notifications.
    pub message_hash: Hash,
}
