//! Local secp256k1 delegate key.
//!
//! Signs the raw safeTxHash (no message prefix), which is what the
//! transaction service expects from a proposing delegate.

use k256::ecdsa::{SigningKey, VerifyingKey};
use shared_types::{Address, Bytes, Hash};
use ss_04_hash_verifier::abi::keccak256;

use crate::errors::SignerError;
use crate::ports::DelegateSigner;

/// Address of an uncompressed secp256k1 public key: last 20 bytes of
/// keccak256 over the point without its `0x04` tag.
pub fn address_of(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    Address::from_slice(&hash.as_bytes()[12..])
}

pub struct LocalKeySigner {
    key: SigningKey,
    address: Address,
}

impl LocalKeySigner {
    /// Parse a 32-byte hex private key, with or without `0x`.
    pub fn from_hex(raw: &str, env: &str) -> Result<Self, SignerError> {
        let invalid = |message: String| SignerError::InvalidKey {
            env: env.to_string(),
            message,
        };
        let bytes = hex::decode(raw.trim().trim_start_matches("0x")).map_err(|e| invalid(e.to_string()))?;
        let key = SigningKey::from_slice(&bytes).map_err(|e| invalid(e.to_string()))?;
        let address = address_of(key.verifying_key());
        Ok(Self { key, address })
    }

    /// Load the key from environment variable `env`. An unset or empty
    /// variable is not an error; submission will report the missing signer.
    pub fn from_env(env: &str) -> Result<Option<Self>, SignerError> {
        match std::env::var(env) {
            Ok(raw) if !raw.trim().is_empty() => Self::from_hex(&raw, env).map(Some),
            _ => Ok(None),
        }
    }
}

impl DelegateSigner for LocalKeySigner {
    fn address(&self) -> Address {
        self.address
    }

    fn sign_hash(&self, hash: &Hash) -> Result<Bytes, SignerError> {
        let (signature, recovery_id) = self
            .key
            .sign_prehash_recoverable(hash.as_bytes())
            .map_err(|e| SignerError::Signing(e.to_string()))?;
        let mut out = signature.to_bytes().to_vec();
        out.push(recovery_id.to_byte() + 27);
        Ok(Bytes(out))
    }
}
