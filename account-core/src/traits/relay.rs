use std::fmt::Debug;

use async_trait::async_trait;
use auto_impl::auto_impl;
use ethers::types::{Address, H256};

use crate::error::RelayError;
use crate::operation::SignedOperation;
use crate::types::ReceiptStatus;

/// The relayer (bundler) that includes signed operations in the ledger.
#[async_trait]
#[auto_impl(&, Box, Arc)]
pub trait RelayProvider: Send + Sync + Debug {
    /// Forward a signed operation. Returns the relay's operation hash.
    async fn submit_operation(
        &self,
        operation: &SignedOperation,
        entry_point: Address,
    ) -> Result<H256, RelayError>;

    /// Look up the outcome of a previously submitted operation.
    async fn query_receipt(&self, operation_hash: H256) -> Result<ReceiptStatus, RelayError>;
}
