//! # Transaction Hash Verifier Service
//!
//! Cross-checks the locally computed safeTxHash against the deployed
//! contract before anything is signed.

use shared_types::Address;
use tracing::{debug, error};

use crate::domain::eip712::{message_hash, safe_tx_hash, SafeDomain};
use crate::domain::{SafeTxData, VerificationError, VerifiedHash};
use crate::ports::SafeContract;

pub struct TransactionHashVerifier<C: SafeContract> {
    contract: C,
    chain_id: u64,
}

impl<C: SafeContract> TransactionHashVerifier<C> {
    pub fn new(contract: C, chain_id: u64) -> Self {
        Self { contract, chain_id }
    }

    /// Hash `tx` for `safe` locally and require the contract to agree.
    ///
    /// `version` is the Safe's synced contract version; `None` means the
    /// default release.
    pub async fn verify(
        &self,
        safe: Address,
        version: Option<&str>,
        tx: &SafeTxData,
    ) -> Result<VerifiedHash, VerificationError> {
        let domain = SafeDomain::new(self.chain_id, safe, version)?;
        let computed = safe_tx_hash(&domain, tx);
        let message_hash = message_hash(&domain, tx);

        let on_chain = self
            .contract
            .get_transaction_hash(safe, tx)
            .await
            .map_err(|source| VerificationError::Contract { safe, source })?;

        if computed != on_chain {
            error!(
                safe = %format!("{safe:#x}"),
                nonce = tx.nonce,
                computed = %format!("{computed:#x}"),
                on_chain = %format!("{on_chain:#x}"),
                "safeTxHash mismatch"
            );
            return Err(VerificationError::HashMismatch {
                safe,
                nonce: tx.nonce,
                computed,
                on_chain,
            });
        }

        debug!(
            safe = %format!("{safe:#x}"),
            nonce = tx.nonce,
            safe_tx_hash = %format!("{computed:#x}"),
            "safeTxHash verified"
        );
        Ok(VerifiedHash {
            safe_tx_hash: computed,
            message_hash,
        })
    }
}
