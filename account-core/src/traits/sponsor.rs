use std::fmt::Debug;

use async_trait::async_trait;
use auto_impl::auto_impl;
use derive_new::new;
use ethers::types::Address;

use crate::error::SponsorError;
use crate::operation::Operation;
use crate::types::Sponsorship;

/// Account metadata sent along with a sponsorship request.
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct SponsorContext {
    /// Chain the operation targets
    pub chain_id: u64,
    /// Entry point the operation is validated by
    pub entry_point: Address,
}

/// The sponsor (paymaster) that covers execution cost.
#[async_trait]
#[auto_impl(&, Box, Arc)]
pub trait SponsorProvider: Send + Sync + Debug {
    /// Ask the sponsor to cover `operation`. The operation is unsigned.
    async fn request_sponsorship(
        &self,
        operation: &Operation,
        context: &SponsorContext,
    ) -> Result<Sponsorship, SponsorError>;
}
