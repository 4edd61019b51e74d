//! # Solidity ABI
//!
//! Safe and MultiSend call data go through `alloy-sol-types`. The 32-byte
//! word helpers back the independent struct-hash layout in `eip712.rs`, and
//! MultiSend's packed transaction list is built by hand since it is not a
//! standard ABI type.

use alloy_primitives::{Address as SolAddress, FixedBytes, U256 as SolU256};
use alloy_sol_types::{sol, SolCall};
use sha3::{Digest, Keccak256};
use shared_types::{Address, Bytes, Hash, Operation, U256};

use super::entities::{PlannedCall, SafeTxData};
use super::errors::ContractError;

sol! {
    interface ISafe {
        function approveHash(bytes32 hashToApprove) external;

        function getTransactionHash(
            address to,
            uint256 value,
            bytes data,
            uint8 operation,
            uint256 safeTxGas,
            uint256 baseGas,
            uint256 gasPrice,
            address gasToken,
            address refundReceiver,
            uint256 _nonce
        ) external view returns (bytes32);
    }

    interface IMultiSend {
        function multiSend(bytes transactions) external payable;
    }
}

pub type Word = [u8; 32];

pub fn keccak256(data: &[u8]) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    Hash::from_slice(&hasher.finalize())
}

pub fn word_address(address: &Address) -> Word {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_bytes());
    word
}

pub fn word_uint(value: &U256) -> Word {
    let mut word = [0u8; 32];
    value.to_big_endian(&mut word);
    word
}

pub fn word_u64(value: u64) -> Word {
    word_uint(&U256::from(value))
}

pub fn word_hash(hash: &Hash) -> Word {
    hash.to_fixed_bytes()
}

pub(crate) fn sol_address(address: &Address) -> SolAddress {
    SolAddress::from(address.to_fixed_bytes())
}

pub(crate) fn sol_uint(value: &U256) -> SolU256 {
    SolU256::from_be_bytes(word_uint(value))
}

pub(crate) fn sol_hash(hash: &Hash) -> FixedBytes<32> {
    FixedBytes(hash.to_fixed_bytes())
}

/// `approveHash(bytes32)`
pub fn approve_hash_calldata(hash: &Hash) -> Bytes {
    let call = ISafe::approveHashCall {
        hashToApprove: sol_hash(hash),
    };
    Bytes(call.abi_encode())
}

/// `getTransactionHash(...)` for the given transaction parameters.
pub fn get_transaction_hash_calldata(tx: &SafeTxData) -> Bytes {
    let call = ISafe::getTransactionHashCall {
        to: sol_address(&tx.to),
        value: sol_uint(&tx.value),
        data: tx.data.0.clone().into(),
        operation: tx.operation.as_u8(),
        safeTxGas: sol_uint(&tx.safe_tx_gas),
        baseGas: sol_uint(&tx.base_gas),
        gasPrice: sol_uint(&tx.gas_price),
        gasToken: sol_address(&tx.gas_token),
        refundReceiver: sol_address(&tx.refund_receiver),
        _nonce: SolU256::from(tx.nonce),
    };
    Bytes(call.abi_encode())
}

/// Decode the `bytes32` returned by `getTransactionHash`.
pub fn decode_transaction_hash(output: &[u8]) -> Result<Hash, ContractError> {
    let decoded = ISafe::getTransactionHashCall::abi_decode_returns(output, true)
        .map_err(|e| ContractError::MalformedReturn(e.to_string()))?;
    Ok(Hash::from(decoded._0.0))
}

/// MultiSend's packed list: `operation(1) ‖ to(20) ‖ value(32) ‖ len(32) ‖ data`
/// per call.
pub fn pack_multi_send(calls: &[PlannedCall]) -> Vec<u8> {
    let mut packed = Vec::new();
    for call in calls {
        packed.push(call.operation.as_u8());
        packed.extend_from_slice(call.to.as_bytes());
        packed.extend_from_slice(&word_uint(&call.value));
        packed.extend_from_slice(&word_u64(call.data.0.len() as u64));
        packed.extend_from_slice(call.data.as_slice());
    }
    packed
}

/// A single DelegateCall into MultiSendCallOnly executing `calls`.
pub fn multi_send(multi_send: Address, calls: &[PlannedCall]) -> PlannedCall {
    let call = IMultiSend::multiSendCall {
        transactions: pack_multi_send(calls).into(),
    };
    PlannedCall {
        to: multi_send,
        value: U256::zero(),
        data: Bytes(call.abi_encode()),
        operation: Operation::DelegateCall,
    }
}
