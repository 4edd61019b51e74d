//! Records exchanged with the transaction service.
//!
//! The service reports numbers inconsistently across releases (`"5"` or
//! `5`), so numeric fields accept either form.

use std::collections::BTreeSet;
use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use shared_types::{
    Address, Bytes, Delegate, ExecutionStatus, Hash, Operation, SafeState, Transaction, U256,
};
use ss_04_hash_verifier::SafeTxData;

use crate::errors::ServiceError;

struct FlexibleU256;

impl<'de> Visitor<'de> for FlexibleU256 {
    type Value = U256;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an unsigned integer or a decimal/hex string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<U256, E> {
        Ok(U256::from(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<U256, E> {
        match v.strip_prefix("0x") {
            Some(digits) => U256::from_str_radix(digits, 16).map_err(E::custom),
            None => U256::from_dec_str(v).map_err(E::custom),
        }
    }

    fn visit_unit<E: de::Error>(self) -> Result<U256, E> {
        Ok(U256::zero())
    }
}

pub(crate) fn flexible_u256<'de, D: Deserializer<'de>>(d: D) -> Result<U256, D::Error> {
    d.deserialize_any(FlexibleU256)
}

pub(crate) fn flexible_u64<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
    let value = flexible_u256(d)?;
    if value > U256::from(u64::MAX) {
        return Err(de::Error::custom(format!("{value} does not fit in 64 bits")));
    }
    Ok(value.as_u64())
}

fn decimal<S: serde::Serializer>(value: &U256, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&value.to_string())
}

/// `GET /api/v1/safes/{address}/`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeInfo {
    pub address: Address,
    #[serde(deserialize_with = "flexible_u64")]
    pub nonce: u64,
    #[serde(deserialize_with = "flexible_u64")]
    pub threshold: u64,
    pub owners: Vec<Address>,
    pub version: Option<String>,
}

/// One entry of `GET /api/v2/delegates/?safe=...`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegateRecord {
    pub delegate: Address,
    pub delegator: Address,
    #[serde(default)]
    pub label: String,
}

impl From<DelegateRecord> for Delegate {
    fn from(record: DelegateRecord) -> Self {
        Delegate {
            delegate: record.delegate,
            delegator: record.delegator,
            label: record.label,
        }
    }
}

/// Offset pagination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: usize,
    pub limit: usize,
}

impl PageRequest {
    pub const DEFAULT_LIMIT: usize = 100;

    pub fn first() -> Self {
        Self {
            offset: 0,
            limit: Self::DEFAULT_LIMIT,
        }
    }

    pub fn next(self, received: usize) -> Self {
        Self {
            offset: self.offset + received,
            limit: self.limit,
        }
    }
}

/// A page of a paginated listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Page<T> {
    #[serde(default)]
    pub next: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn is_last(&self) -> bool {
        self.next.is_none() || self.results.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Confirmation {
    pub owner: Address,
}

/// One entry of `GET /api/v1/safes/{address}/multisig-transactions/`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceTransaction {
    pub safe: Address,
    pub to: Address,
    #[serde(deserialize_with = "flexible_u256")]
    pub value: U256,
    #[serde(default)]
    pub data: Option<Bytes>,
    pub operation: u8,
    #[serde(default, deserialize_with = "flexible_u256")]
    pub safe_tx_gas: U256,
    #[serde(default, deserialize_with = "flexible_u256")]
    pub base_gas: U256,
    #[serde(default, deserialize_with = "flexible_u256")]
    pub gas_price: U256,
    #[serde(default)]
    pub gas_token: Option<Address>,
    #[serde(default)]
    pub refund_receiver: Option<Address>,
    #[serde(deserialize_with = "flexible_u64")]
    pub nonce: u64,
    pub safe_tx_hash: Hash,
    #[serde(default)]
    pub is_executed: bool,
    #[serde(default)]
    pub is_successful: Option<bool>,
    #[serde(default)]
    pub transaction_hash: Option<Hash>,
    #[serde(default)]
    pub confirmations: Vec<Confirmation>,
}

impl TryFrom<ServiceTransaction> for Transaction {
    type Error = ServiceError;

    fn try_from(tx: ServiceTransaction) -> Result<Self, Self::Error> {
        let operation = Operation::from_u8(tx.operation).ok_or_else(|| {
            ServiceError::Malformed(format!(
                "transaction {:#x} has operation {}",
                tx.safe_tx_hash, tx.operation
            ))
        })?;
        let status = if tx.is_executed {
            ExecutionStatus::Executed {
                successful: tx.is_successful.unwrap_or(false),
                transaction_hash: tx.transaction_hash,
            }
        } else {
            ExecutionStatus::Pending
        };
        Ok(Transaction {
            safe: tx.safe,
            to: tx.to,
            value: tx.value,
            data: tx.data.unwrap_or_default(),
            operation,
            safe_tx_gas: tx.safe_tx_gas,
            base_gas: tx.base_gas,
            gas_price: tx.gas_price,
            gas_token: tx.gas_token.unwrap_or_default(),
            refund_receiver: tx.refund_receiver.unwrap_or_default(),
            nonce: tx.nonce,
            safe_tx_hash: tx.safe_tx_hash,
            status,
            confirmations: tx
                .confirmations
                .into_iter()
                .map(|c| c.owner)
                .collect::<BTreeSet<_>>(),
        })
    }
}

/// Everything fetched for one Safe before the store is touched.
#[derive(Debug, Clone)]
pub struct SafeSnapshot {
    pub state: SafeState,
    pub transactions: Vec<Transaction>,
}

impl SafeSnapshot {
    pub fn new(info: SafeInfo, delegates: Vec<DelegateRecord>, transactions: Vec<Transaction>) -> Self {
        Self {
            state: SafeState {
                owners: info.owners,
                delegates: delegates.into_iter().map(Delegate::from).collect(),
                threshold: info.threshold,
                nonce: info.nonce,
                version: info.version.unwrap_or_default(),
            },
            transactions,
        }
    }
}

/// `POST /api/v1/safes/{address}/multisig-transactions/estimations/` response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Estimation {
    #[serde(deserialize_with = "flexible_u256")]
    pub safe_tx_gas: U256,
}

/// Body of `POST /api/v1/safes/{address}/multisig-transactions/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposedTransaction {
    pub safe: Address,
    pub to: Address,
    #[serde(serialize_with = "decimal")]
    pub value: U256,
    pub data: Option<Bytes>,
    pub operation: u8,
    #[serde(serialize_with = "decimal")]
    pub safe_tx_gas: U256,
    #[serde(serialize_with = "decimal")]
    pub base_gas: U256,
    #[serde(serialize_with = "decimal")]
    pub gas_price: U256,
    pub gas_token: Address,
    pub refund_receiver: Address,
    pub nonce: u64,
    pub contract_transaction_hash: Hash,
    pub sender: Address,
    pub signature: Bytes,
    pub origin: String,
}

impl ProposedTransaction {
    pub fn new(
        safe: Address,
        tx: &SafeTxData,
        safe_tx_hash: Hash,
        sender: Address,
        signature: Bytes,
        origin: impl Into<String>,
    ) -> Self {
        Self {
            safe,
            to: tx.to,
            value: tx.value,
            data: (!tx.data.is_empty()).then(|| tx.data.clone()),
            operation: tx.operation.as_u8(),
            safe_tx_gas: tx.safe_tx_gas,
            base_gas: tx.base_gas,
            gas_price: tx.gas_price,
            gas_token: tx.gas_token,
            refund_receiver: tx.refund_receiver,
            nonce: tx.nonce,
            contract_transaction_hash: safe_tx_hash,
            sender,
            signature,
            origin: origin.into(),
        }
    }
}

/// Body of the estimation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimationRequest {
    pub to: Address,
    #[serde(serialize_with = "decimal")]
    pub value: U256,
    pub data: Option<Bytes>,
    pub operation: u8,
}

impl From<&SafeTxData> for EstimationRequest {
    fn from(tx: &SafeTxData) -> Self {
        Self {
            to: tx.to,
            value: tx.value,
            data: (!tx.data.is_empty()).then(|| tx.data.clone()),
            operation: tx.operation.as_u8(),
        }
    }
}
