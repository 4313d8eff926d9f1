use std::{fmt::Debug, time::Duration};

use account_core::{ConfigurationError, Rejection, RelayError, SponsorError};
use ethers::providers::{Http, HttpClientError, JsonRpcClient};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};
use url::Url;

/// How a failed JSON-RPC request should be treated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RpcFault {
    /// The request never got a usable answer (timeout, connection reset)
    Transport(String),
    /// The endpoint returned a JSON-RPC error object
    Rejected(Rejection),
    /// The response body could not be decoded
    Malformed(String),
}

impl From<HttpClientError> for RpcFault {
    fn from(err: HttpClientError) -> Self {
        match err {
            HttpClientError::ReqwestError(e) => RpcFault::Transport(e.to_string()),
            HttpClientError::JsonRpcError(e) => RpcFault::Rejected(Rejection::new(e.code, e.message)),
            HttpClientError::SerdeJson { err, text } => {
                RpcFault::Malformed(format!("{err}; response: {text}"))
            }
        }
    }
}

impl From<RpcFault> for RelayError {
    fn from(fault: RpcFault) -> Self {
        match fault {
            RpcFault::Transport(e) => RelayError::Transport(e),
            RpcFault::Rejected(r) => RelayError::Rejected(r),
            RpcFault::Malformed(e) => RelayError::MalformedResponse(e),
        }
    }
}

impl From<RpcFault> for SponsorError {
    fn from(fault: RpcFault) -> Self {
        match fault {
            RpcFault::Transport(e) => SponsorError::Transport(e),
            RpcFault::Rejected(r) => SponsorError::Rejected(r),
            RpcFault::Malformed(e) => SponsorError::MalformedResponse(e),
        }
    }
}

/// A single JSON-RPC endpoint with a per-request timeout. Does not retry;
/// retry policy belongs to the caller.
#[derive(Debug, Clone)]
pub(crate) struct JsonRpcEndpoint {
    http: Http,
    name: &'static str,
}

impl JsonRpcEndpoint {
    pub(crate) fn new(
        name: &'static str,
        url: Url,
        timeout: Duration,
    ) -> Result<Self, ConfigurationError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigurationError::InvalidOption {
                option: "relayTimeoutMs",
                reason: e.to_string(),
            })?;
        Ok(Self {
            http: Http::new_with_client(url, client),
            name,
        })
    }

    pub(crate) async fn request<T, R>(&self, method: &str, params: T) -> Result<R, RpcFault>
    where
        T: Debug + Serialize + Send + Sync,
        R: DeserializeOwned + Send,
    {
        debug!(endpoint = self.name, method, "Dispatching request");
        self.http.request(method, params).await.map_err(|e| {
            let fault = RpcFault::from(e);
            warn!(endpoint = self.name, method, ?fault, "JSON-RPC request failed");
            fault
        })
    }
}

#[cfg(test)]
mod tests {
    use ethers::providers::JsonRpcError;

    use super::*;

    #[test]
    fn json_rpc_errors_are_rejections() {
        let err = HttpClientError::JsonRpcError(JsonRpcError {
            code: -32602,
            message: "invalid nonce".into(),
            data: None,
        });
        assert_eq!(
            RelayError::from(RpcFault::from(err)),
            RelayError::Rejected(Rejection::new(-32602, "invalid nonce"))
        );
    }

    #[test]
    fn garbled_bodies_are_malformed() {
        let err = HttpClientError::SerdeJson {
            err: serde_json::from_str::<u8>("<html>").unwrap_err(),
            text: "<html>".into(),
        };
        assert!(matches!(
            SponsorError::from(RpcFault::from(err)),
            SponsorError::MalformedResponse(_)
        ));
    }
}
