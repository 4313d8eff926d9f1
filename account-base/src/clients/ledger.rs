use std::time::Duration;

use account_core::{
    calls, Address, Bytes, ConfigurationError, GasFees, LedgerError, LedgerReader, LedgerResult,
    TokenAmount, U256,
};
use async_trait::async_trait;
use ethers::providers::{Http, Middleware, Provider, ProviderError, RpcError};
use ethers::types::{transaction::eip2718::TypedTransaction, TransactionRequest};
use tracing::instrument;
use url::Url;

/// Ledger reads against a node's JSON-RPC API.
#[derive(Debug, Clone)]
pub struct NodeLedger {
    provider: Provider<Http>,
}

fn classify(target: Address, err: ProviderError) -> LedgerError {
    if let Some(response) = err.as_error_response() {
        return LedgerError::CallFailed {
            target,
            message: response.message.clone(),
        };
    }
    match err {
        ProviderError::SerdeJson(e) => LedgerError::Decode(e.to_string()),
        other => LedgerError::Transport(other.to_string()),
    }
}

fn decode_uint(output: &[u8]) -> LedgerResult<U256> {
    calls::decode_uint(output).map_err(|e| LedgerError::Decode(e.to_string()))
}

impl NodeLedger {
    /// Reads from the node at `url`. `timeout` bounds each request.
    pub fn new(url: Url, timeout: Duration) -> Result<Self, ConfigurationError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigurationError::InvalidOption {
                option: "ledgerUrl",
                reason: e.to_string(),
            })?;
        Ok(Self {
            provider: Provider::new(Http::new_with_client(url, client)),
        })
    }

    async fn call(&self, target: Address, data: Bytes) -> LedgerResult<Bytes> {
        let tx: TypedTransaction = TransactionRequest::new().to(target).data(data).into();
        self.provider
            .call(&tx, None)
            .await
            .map_err(|e| classify(target, e))
    }

    async fn call_uint(&self, target: Address, data: Bytes) -> LedgerResult<U256> {
        let output = self.call(target, data).await?;
        decode_uint(&output)
    }
}

#[async_trait]
impl LedgerReader for NodeLedger {
    #[instrument(skip(self))]
    async fn token_balance(&self, token: Address, owner: Address) -> LedgerResult<TokenAmount> {
        let amount = self.call_uint(token, calls::balance_of(owner)).await?;
        let decimals = self.call_uint(token, calls::decimals()).await?;
        let decimals = u8::try_from(decimals)
            .map_err(|_| LedgerError::Decode(format!("decimals out of range: {decimals}")))?;
        Ok(TokenAmount::new(amount, decimals))
    }

    #[instrument(skip(self))]
    async fn account_nonce(&self, account: Address, entry_point: Address) -> LedgerResult<U256> {
        self.call_uint(entry_point, calls::get_nonce(account, U256::zero()))
            .await
    }

    #[instrument(skip(self))]
    async fn is_deployed(&self, account: Address) -> LedgerResult<bool> {
        let code = self
            .provider
            .get_code(account, None)
            .await
            .map_err(|e| classify(account, e))?;
        Ok(!code.is_empty())
    }

    #[instrument(skip(self))]
    async fn fee_estimate(&self) -> LedgerResult<GasFees> {
        let (max_fee_per_gas, max_priority_fee_per_gas) = self
            .provider
            .estimate_eip1559_fees(None)
            .await
            .map_err(|e| classify(Address::zero(), e))?;
        Ok(GasFees {
            max_fee_per_gas,
            max_priority_fee_per_gas,
        })
    }

    #[instrument(skip(self))]
    async fn router_reserve(&self, router: Address, token: Address) -> LedgerResult<U256> {
        self.call_uint(router, calls::get_reserve(token)).await
    }
}

#[cfg(test)]
mod tests {
    use ethers::abi::{self, Token};

    use super::*;

    #[test]
    fn decodes_uint_results() {
        let output = abi::encode(&[Token::Uint(U256::from(18))]);
        assert_eq!(decode_uint(&output).unwrap(), U256::from(18));
    }

    #[test]
    fn short_results_are_decode_errors() {
        assert!(matches!(decode_uint(&[0u8; 3]), Err(LedgerError::Decode(_))));
    }

    #[test]
    fn transport_errors_are_classified() {
        let err = ProviderError::CustomError("connection reset".into());
        assert!(matches!(
            classify(Address::zero(), err),
            LedgerError::Transport(message) if message.contains("connection reset")
        ));
    }
}
