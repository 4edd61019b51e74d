//! # EIP-712 SafeTx hashing
//!
//! ```text
//! safeTxHash    = keccak256(0x19 ‖ 0x01 ‖ domainSeparator ‖ messageHash)
//! messageHash   = keccak256(abi.encode(SAFE_TX_TYPEHASH, to, value,
//!                     keccak256(data), operation, safeTxGas, baseGas,
//!                     gasPrice, gasToken, refundReceiver, nonce))
//! ```
//!
//! The domain and SafeTx type strings changed across Safe releases:
//!
//! | Version | Domain | Gas field |
//! |---------|--------|-----------|
//! | `< 1.0.0` | `EIP712Domain(address verifyingContract)` | `dataGas` |
//! | `< 1.3.0` | `EIP712Domain(address verifyingContract)` | `baseGas` |
//! | `>= 1.3.0` | `EIP712Domain(uint256 chainId,address verifyingContract)` | `baseGas` |

use alloy_primitives::U256 as SolU256;
use alloy_sol_types::SolValue;
use shared_types::{Address, Hash, SafeVersion};

use super::abi::{
    keccak256, sol_address, sol_hash, sol_uint, word_address, word_hash, word_u64, word_uint,
};
use super::entities::SafeTxData;
use super::errors::VerificationError;

pub const SAFE_TX_TYPE: &str = "SafeTx(address to,uint256 value,bytes data,uint8 operation,uint256 safeTxGas,uint256 baseGas,uint256 gasPrice,address gasToken,address refundReceiver,uint256 nonce)";
pub const LEGACY_SAFE_TX_TYPE: &str = "SafeTx(address to,uint256 value,bytes data,uint8 operation,uint256 safeTxGas,uint256 dataGas,uint256 gasPrice,address gasToken,address refundReceiver,uint256 nonce)";
pub const DOMAIN_TYPE: &str = "EIP712Domain(uint256 chainId,address verifyingContract)";
pub const LEGACY_DOMAIN_TYPE: &str = "EIP712Domain(address verifyingContract)";

/// Release assumed for Safes whose version has not been synced yet.
pub const DEFAULT_VERSION: SafeVersion = SafeVersion::new(1, 3, 0);

const CHAIN_ID_DOMAIN_SINCE: SafeVersion = SafeVersion::new(1, 3, 0);
const BASE_GAS_SINCE: SafeVersion = SafeVersion::new(1, 0, 0);

/// The EIP-712 domain of one Safe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SafeDomain {
    pub chain_id: u64,
    pub safe: Address,
    pub version: SafeVersion,
}

impl SafeDomain {
    pub fn new(chain_id: u64, safe: Address, version: Option<&str>) -> Result<Self, VerificationError> {
        let version = match version {
            Some(raw) => SafeVersion::parse(raw).map_err(|_| VerificationError::InvalidVersion {
                safe,
                version: raw.to_string(),
            })?,
            None => DEFAULT_VERSION,
        };
        Ok(Self {
            chain_id,
            safe,
            version,
        })
    }

    pub fn separator(&self) -> Hash {
        if self.version >= CHAIN_ID_DOMAIN_SINCE {
            let encoded = (
                sol_hash(&keccak256(DOMAIN_TYPE.as_bytes())),
                SolU256::from(self.chain_id),
                sol_address(&self.safe),
            )
                .abi_encode();
            keccak256(&encoded)
        } else {
            let encoded = (
                sol_hash(&keccak256(LEGACY_DOMAIN_TYPE.as_bytes())),
                sol_address(&self.safe),
            )
                .abi_encode();
            keccak256(&encoded)
        }
    }

    pub fn safe_tx_typehash(&self) -> Hash {
        if self.version >= BASE_GAS_SINCE {
            keccak256(SAFE_TX_TYPE.as_bytes())
        } else {
            keccak256(LEGACY_SAFE_TX_TYPE.as_bytes())
        }
    }
}

/// The signing hash, with the struct encoded by the ABI library.
pub fn safe_tx_hash(domain: &SafeDomain, tx: &SafeTxData) -> Hash {
    let encoded = (
        sol_hash(&domain.safe_tx_typehash()),
        sol_address(&tx.to),
        sol_uint(&tx.value),
        sol_hash(&keccak256(tx.data.as_slice())),
        u16::from(tx.operation.as_u8()),
        sol_uint(&tx.safe_tx_gas),
        sol_uint(&tx.base_gas),
        sol_uint(&tx.gas_price),
        sol_address(&tx.gas_token),
        sol_address(&tx.refund_receiver),
        SolU256::from(tx.nonce),
    )
        .abi_encode();
    typed_data_hash(&domain.separator(), &keccak256(&encoded))
}

/// The SafeTx struct hash, laid out word by word.
pub fn message_hash(domain: &SafeDomain, tx: &SafeTxData) -> Hash {
    let words: [[u8; 32]; 11] = [
        word_hash(&domain.safe_tx_typehash()),
        word_address(&tx.to),
        word_uint(&tx.value),
        word_hash(&keccak256(tx.data.as_slice())),
        word_u64(u64::from(tx.operation.as_u8())),
        word_uint(&tx.safe_tx_gas),
        word_uint(&tx.base_gas),
        word_uint(&tx.gas_price),
        word_address(&tx.gas_token),
        word_address(&tx.refund_receiver),
        word_u64(tx.nonce),
    ];
    keccak256(&words.concat())
}

/// `keccak256(0x19 ‖ 0x01 ‖ domainSeparator ‖ structHash)`
pub fn typed_data_hash(domain_separator: &Hash, struct_hash: &Hash) -> Hash {
    let mut preimage = Vec::with_capacity(66);
    preimage.extend_from_slice(&[0x19, 0x01]);
    preimage.extend_from_slice(domain_separator.as_bytes());
    preimage.extend_from_slice(struct_hash.as_bytes());
    keccak256(&preimage)
}
