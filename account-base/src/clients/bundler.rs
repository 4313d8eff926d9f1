use std::time::Duration;

use account_core::{
    Address, ConfigurationError, ReceiptStatus, RelayError, RelayProvider, SignedOperation, H256,
};
use async_trait::async_trait;
use tracing::instrument;
use url::Url;

use super::rpc::JsonRpcEndpoint;
use super::rpc_types::{RpcOperationReceipt, RpcUserOperation};

/// Relay adapter speaking the ERC-4337 bundler JSON-RPC API.
#[derive(Debug, Clone)]
pub struct BundlerClient {
    rpc: JsonRpcEndpoint,
}

impl BundlerClient {
    /// A client for the bundler at `url`. `timeout` bounds each request.
    pub fn new(url: Url, timeout: Duration) -> Result<Self, ConfigurationError> {
        Ok(Self {
            rpc: JsonRpcEndpoint::new("bundler", url, timeout)?,
        })
    }
}

#[async_trait]
impl RelayProvider for BundlerClient {
    #[instrument(skip(self, operation), fields(hash = ?operation.hash()))]
    async fn submit_operation(
        &self,
        operation: &SignedOperation,
        entry_point: Address,
    ) -> Result<H256, RelayError> {
        let user_op = RpcUserOperation::signed(operation);
        let hash: H256 = self
            .rpc
            .request("eth_sendUserOperation", (user_op, entry_point))
            .await?;
        Ok(hash)
    }

    #[instrument(skip(self))]
    async fn query_receipt(&self, operation_hash: H256) -> Result<ReceiptStatus, RelayError> {
        let receipt: Option<RpcOperationReceipt> = self
            .rpc
            .request("eth_getUserOperationReceipt", [operation_hash])
            .await?;
        if let Some(receipt) = receipt {
            return Ok(ReceiptStatus::Terminal(receipt.into()));
        }

        // No receipt yet. Whether the bundler still holds the operation tells
        // pending apart from unknown.
        let known: Option<serde_json::Value> = self
            .rpc
            .request("eth_getUserOperationByHash", [operation_hash])
            .await?;
        Ok(match known {
            Some(_) => ReceiptStatus::Pending,
            None => ReceiptStatus::NotFound,
        })
    }
}
