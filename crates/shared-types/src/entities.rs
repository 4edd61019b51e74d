//! # Core Domain Entities
//!
//! The records a Safe-Sync repository is made of.
//!
//! ## Kinds
//!
//! - **Safe**: multisig wallet, bare (address + name only) or populated with
//!   owners, delegates, threshold and on-chain nonce
//! - **EOA**: plain keypair account, a leaf in the ownership graph
//! - **Transaction**: a multisig transaction known to the transaction service
//! - **Proposal**: a declarative request, either a function call through a Safe
//!   or an approval of a parent Safe's transaction hash

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::TypeError;

pub use primitive_types::{H160, H256, U256};

/// A 20-byte account address.
pub type Address = H160;

/// A 32-byte Keccak hash (safeTxHash, approval hashes).
pub type Hash = H256;

// =============================================================================
// ENTITY KINDS
// =============================================================================

/// Discriminant used in error messages and index bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Safe,
    Eoa,
    Transaction,
    Proposal,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Safe => "safe",
            EntityKind::Eoa => "eoa",
            EntityKind::Transaction => "transaction",
            EntityKind::Proposal => "proposal",
        };
        f.write_str(name)
    }
}

// =============================================================================
// SAFE
// =============================================================================

/// An address allowed to propose transactions for a Safe without owning it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Delegate {
    pub delegate: Address,
    pub delegator: Address,
    #[serde(default)]
    pub label: String,
}

/// Where notifications about a Safe's proposals are posted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifyTargets {
    pub channels: Vec<String>,
}

/// A Safe known only by address and name, not yet synced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BareSafe {
    pub address: Address,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notify: Option<NotifyTargets>,
}

/// A Safe with its signing authority structure filled in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulatedSafe {
    pub address: Address,
    pub name: String,
    pub owners: Vec<Address>,
    #[serde(default)]
    pub delegates: Vec<Delegate>,
    pub threshold: u64,
    pub nonce: u64,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notify: Option<NotifyTargets>,
}

/// Live state fetched from the transaction service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafeState {
    pub owners: Vec<Address>,
    pub delegates: Vec<Delegate>,
    pub threshold: u64,
    pub nonce: u64,
    pub version: String,
}

/// A multisig wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Safe {
    Populated(PopulatedSafe),
    Bare(BareSafe),
}

impl Safe {
    /// A freshly declared Safe with no synced state.
    pub fn bare(address: Address, name: impl Into<String>) -> Self {
        Safe::Bare(BareSafe {
            address,
            name: name.into(),
            notify: None,
        })
    }

    pub fn address(&self) -> Address {
        match self {
            Safe::Populated(s) => s.address,
            Safe::Bare(s) => s.address,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Safe::Populated(s) => &s.name,
            Safe::Bare(s) => &s.name,
        }
    }

    /// Owners, empty until the Safe has been synced.
    pub fn owners(&self) -> &[Address] {
        match self {
            Safe::Populated(s) => &s.owners,
            Safe::Bare(_) => &[],
        }
    }

    pub fn delegates(&self) -> &[Delegate] {
        match self {
            Safe::Populated(s) => &s.delegates,
            Safe::Bare(_) => &[],
        }
    }

    pub fn threshold(&self) -> Option<u64> {
        match self {
            Safe::Populated(s) => Some(s.threshold),
            Safe::Bare(_) => None,
        }
    }

    pub fn version(&self) -> Option<&str> {
        match self {
            Safe::Populated(s) => Some(&s.version),
            Safe::Bare(_) => None,
        }
    }

    pub fn notify(&self) -> Option<&NotifyTargets> {
        match self {
            Safe::Populated(s) => s.notify.as_ref(),
            Safe::Bare(s) => s.notify.as_ref(),
        }
    }

    /// True if `address` is registered as a delegate of this Safe.
    pub fn has_delegate(&self, address: &Address) -> bool {
        self.delegates().iter().any(|d| d.delegate == *address)
    }

    /// Replace the synced state, keeping identity and notification targets.
    pub fn with_state(self, state: SafeState) -> Self {
        let (address, name, notify) = match self {
            Safe::Populated(s) => (s.address, s.name, s.notify),
            Safe::Bare(s) => (s.address, s.name, s.notify),
        };
        Safe::Populated(PopulatedSafe {
            address,
            name,
            owners: state.owners,
            delegates: state.delegates,
            threshold: state.threshold,
            nonce: state.nonce,
            version: state.version,
            notify,
        })
    }
}

/// Parsed `major.minor.patch` Safe contract version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SafeVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl SafeVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse versions such as `1.3.0` or `1.3.0+L2`.
    pub fn parse(raw: &str) -> Result<Self, TypeError> {
        let core = raw.split('+').next().unwrap_or(raw).trim();
        let mut parts = core.split('.').map(str::parse::<u32>);
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(Ok(major)), Some(Ok(minor)), Some(Ok(patch)), None) => {
                Ok(Self::new(major, minor, patch))
            }
            _ => Err(TypeError::InvalidVersion(raw.to_string())),
        }
    }
}

impl fmt::Display for SafeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

// =============================================================================
// EOA
// =============================================================================

/// An externally-owned account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Eoa {
    pub address: Address,
    pub name: String,
}

// =============================================================================
// TRANSACTION
// =============================================================================

/// Raw calldata, serialized as `0x`-prefixed lower-case hex.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Bytes(pub Vec<u8>);

impl Bytes {
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.0))
    }

    pub fn from_hex(raw: &str) -> Result<Self, TypeError> {
        let digits = raw.strip_prefix("0x").unwrap_or(raw);
        hex::decode(digits)
            .map(Bytes)
            .map_err(|e| TypeError::InvalidHex(e.to_string()))
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(value: Vec<u8>) -> Self {
        Bytes(value)
    }
}

impl Serialize for Bytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Bytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Bytes::from_hex(&raw).map_err(serde::de::Error::custom)
    }
}

/// Safe operation type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    #[default]
    Call,
    DelegateCall,
}

impl Operation {
    pub fn as_u8(self) -> u8 {
        match self {
            Operation::Call => 0,
            Operation::DelegateCall => 1,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Operation::Call),
            1 => Some(Operation::DelegateCall),
            _ => None,
        }
    }
}

/// Where a transaction stands on chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum ExecutionStatus {
    Pending,
    #[serde(rename_all = "camelCase")]
    Executed {
        successful: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        transaction_hash: Option<Hash>,
    },
}

/// A multisig transaction belonging to exactly one Safe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub safe: Address,
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
    pub safe_tx_hash: Hash,
    pub status: ExecutionStatus,
    #[serde(default)]
    pub confirmations: BTreeSet<Address>,
}

impl Transaction {
    pub fn is_executed(&self) -> bool {
        matches!(self.status, ExecutionStatus::Executed { .. })
    }
}

// =============================================================================
// PROPOSAL
// =============================================================================

/// A nonce as written in a proposal file: a number or a formula string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NonceSpec {
    Literal(u64),
    Expression(String),
}

impl NonceSpec {
    /// The textual form used for literal parsing and formula evaluation.
    pub fn text(&self) -> Cow<'_, str> {
        match self {
            NonceSpec::Literal(n) => Cow::Owned(n.to_string()),
            NonceSpec::Expression(e) => Cow::Borrowed(e),
        }
    }
}

impl fmt::Display for NonceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

/// Call `function` on `contract` through the proposal's Safe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionCall {
    pub contract: Address,
    /// Solidity signature, e.g. `transfer(address,uint256)`.
    pub function: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "U256::is_zero")]
    pub value: U256,
}

/// The parent transaction a child proposal approves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentRef {
    /// The owned Safe whose transaction is being approved.
    pub safe: Address,
    /// safeTxHash of the parent transaction.
    pub hash: Hash,
    /// Index of the approving owner in the parent Safe's owner list.
    pub position: usize,
}

/// What a proposal does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProposalAction {
    Call(FunctionCall),
    ChildOf(ParentRef),
}

/// Notification bookkeeping for idempotent message updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationState {
    pub channel: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// A declarative, git-stored request to act through a Safe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    pub safe: Address,
    pub delegate: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<NonceSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safe_tx_hash: Option<Hash>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub create_child_proposals: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notifications: Vec<NotificationState>,
    #[serde(flatten)]
    pub action: ProposalAction,
}

impl Proposal {
    /// The parent reference of a `childOf` proposal.
    pub fn parent(&self) -> Option<&ParentRef> {
        match &self.action {
            ProposalAction::ChildOf(parent) => Some(parent),
            ProposalAction::Call(_) => None,
        }
    }

    pub fn is_child(&self) -> bool {
        self.parent().is_some()
    }

    pub fn is_submitted(&self) -> bool {
        self.safe_tx_hash.is_some()
    }
}
