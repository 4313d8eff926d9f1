use async_trait::async_trait;
use mockall::*;

use account_core::*;

mock! {
    pub Signer {
        pub fn _address(&self) -> Address {}

        pub fn sign_digest(&self, digest: H256) -> Result<Signature, SignerError> {}
    }
}

impl std::fmt::Debug for MockSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MockSigner")
    }
}

#[async_trait]
impl OwnerSigner for MockSigner {
    fn address(&self) -> Address {
        self._address()
    }

    async fn sign_digest(&self, digest: H256) -> Result<Signature, SignerError> {
        self.sign_digest(digest)
    }
}
