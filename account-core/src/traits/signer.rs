use std::fmt::Debug;

use async_trait::async_trait;
use auto_impl::auto_impl;
use ethers::types::{Address, Signature, H256};

use crate::error::SignerError;

/// The owner's signing capability. May live on a user device or in an
/// embedded key store; `sign_digest` may suspend until the user approves.
#[async_trait]
#[auto_impl(&, Box, Arc)]
pub trait OwnerSigner: Send + Sync + Debug {
    /// Public address of the owner key
    fn address(&self) -> Address;

    /// Sign an operation digest.
    async fn sign_digest(&self, digest: H256) -> Result<Signature, SignerError>;
}
