use std::str::FromStr;

use account_core::{Address, ConfigurationError, OwnerSigner, Signature, SignerError, H256};
use async_trait::async_trait;
use ethers::signers::{LocalWallet, Signer};
use tracing::instrument;

/// Owner signer backed by a private key held in process.
///
/// Digests are signed as EIP-191 personal messages, which is what ECDSA
/// account validators recover against.
#[derive(Debug, Clone)]
pub struct LocalKeySigner {
    wallet: LocalWallet,
}

impl LocalKeySigner {
    /// Signer for a hex encoded private key, with or without `0x`.
    pub fn from_private_key(key: &str) -> Result<Self, ConfigurationError> {
        let wallet = LocalWallet::from_str(key.trim_start_matches("0x")).map_err(|e| {
            ConfigurationError::InvalidOption {
                option: "ownerKey",
                reason: e.to_string(),
            }
        })?;
        Ok(Self { wallet })
    }
}

#[async_trait]
impl OwnerSigner for LocalKeySigner {
    fn address(&self) -> Address {
        self.wallet.address()
    }

    #[instrument(skip(self))]
    async fn sign_digest(&self, digest: H256) -> Result<Signature, SignerError> {
        self.wallet
            .sign_message(digest)
            .await
            .map_err(|e| SignerError::SignerUnavailable(e.to_string()))
    }
}
