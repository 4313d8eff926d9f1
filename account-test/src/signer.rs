use async_trait::async_trait;

use account_core::{Address, OwnerSigner, Signature, SignerError, H256, U256};

/// An owner that signs instantly with a fixed, digest-derived signature, or
/// always declines.
#[derive(Debug, Clone)]
pub struct FakeSigner {
    address: Address,
    declines: bool,
}

impl FakeSigner {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            declines: false,
        }
    }

    /// A signer whose user refuses every request
    pub fn declining(address: Address) -> Self {
        Self {
            address,
            declines: true,
        }
    }
}

#[async_trait]
impl OwnerSigner for FakeSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign_digest(&self, digest: H256) -> Result<Signature, SignerError> {
        if self.declines {
            return Err(SignerError::UserDeclined);
        }
        Ok(Signature {
            r: U256::from_big_endian(digest.as_bytes()),
            s: U256::from_big_endian(self.address.as_bytes()),
            v: 27,
        })
    }
}
