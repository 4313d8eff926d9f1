use std::time::Duration;

use account_core::{
    ConfigurationError, Operation, SponsorContext, SponsorError, SponsorProvider, Sponsorship,
};
use async_trait::async_trait;
use serde::Serialize;
use tracing::instrument;
use url::Url;

use super::rpc::JsonRpcEndpoint;
use super::rpc_types::{RpcSponsorship, RpcUserOperation};

/// Sponsor adapter for the `zd_sponsorUserOperation` paymaster API.
#[derive(Debug, Clone)]
pub struct PaymasterClient {
    rpc: JsonRpcEndpoint,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SponsorRequest {
    chain_id: u64,
    user_op: RpcUserOperation,
    entry_point_address: account_core::Address,
    should_override_fee: bool,
    should_consume: bool,
}

impl PaymasterClient {
    /// A client for the paymaster at `url`. `timeout` bounds each request.
    pub fn new(url: Url, timeout: Duration) -> Result<Self, ConfigurationError> {
        Ok(Self {
            rpc: JsonRpcEndpoint::new("paymaster", url, timeout)?,
        })
    }
}

#[async_trait]
impl SponsorProvider for PaymasterClient {
    #[instrument(skip(self, operation), fields(sender = ?operation.sender, nonce = %operation.nonce))]
    async fn request_sponsorship(
        &self,
        operation: &Operation,
        context: &SponsorContext,
    ) -> Result<Sponsorship, SponsorError> {
        let request = SponsorRequest {
            chain_id: context.chain_id,
            user_op: RpcUserOperation::unsigned(operation),
            entry_point_address: context.entry_point,
            should_override_fee: false,
            should_consume: true,
        };
        let sponsorship: RpcSponsorship = self
            .rpc
            .request("zd_sponsorUserOperation", [request])
            .await?;
        Ok(sponsorship.into())
    }
}

#[cfg(test)]
mod tests {
    use account_core::{calls, Address, U256, ENTRY_POINT_V07};

    use super::*;

    #[test]
    fn request_shape() {
        let op = Operation::new(
            Address::repeat_byte(0x11),
            Address::repeat_byte(0x22),
            calls::approve(Address::repeat_byte(0x33), U256::from(100)),
            U256::zero(),
            U256::zero(),
        );
        let request = SponsorRequest {
            chain_id: 11155111,
            user_op: RpcUserOperation::unsigned(&op),
            entry_point_address: ENTRY_POINT_V07,
            should_override_fee: false,
            should_consume: true,
        };
        let json = serde_json::to_value([request]).unwrap();
        assert_eq!(json[0]["chainId"], 11155111);
        assert_eq!(
            json[0]["entryPointAddress"],
            "0x0000000071727de22e5e9d8baf0edac6f37da032"
        );
        assert_eq!(json[0]["userOp"]["sender"], format!("{:?}", op.sender));
    }
}
