use std::{sync::Arc, time::Duration};

use account_core::{OperationReceipt, PendingHandle, ReceiptStatus, RelayError, RelayProvider, H256};
use tokio::time::{sleep, timeout};
use tracing::{debug, info, instrument, warn};

use crate::retry::RetryPolicy;

/// How a wait for a pending operation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    /// Included and executed successfully
    Confirmed(OperationReceipt),
    /// Included, execution reverted
    Reverted {
        /// The receipt reporting the revert
        receipt: OperationReceipt,
        /// Revert reason, or a generic one when the ledger gave none
        reason: String,
    },
    /// No terminal status within the timeout. Not a failure: the operation
    /// may still land.
    TimedOut,
}

/// Polls the relay until a pending operation reaches a terminal status.
///
/// Consecutive failed queries stretch the poll interval by the retry
/// policy's backoff; the first successful query resets it.
#[derive(Debug, Clone)]
pub struct ReceiptWaiter {
    relay: Arc<dyn RelayProvider>,
    poll_interval: Duration,
    retry: RetryPolicy,
}

impl ReceiptWaiter {
    /// A waiter querying `relay` every `poll_interval`
    pub fn new(relay: Arc<dyn RelayProvider>, poll_interval: Duration, retry: RetryPolicy) -> Self {
        Self {
            relay,
            poll_interval,
            retry,
        }
    }

    /// Wait up to `limit` for `handle` to resolve.
    #[instrument(skip(self), fields(operation_hash = ?handle.operation_hash))]
    pub async fn wait(&self, handle: &PendingHandle, limit: Duration) -> WaitOutcome {
        match timeout(limit, self.poll(handle.operation_hash)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                info!(?limit, "Operation not resolved in time");
                WaitOutcome::TimedOut
            }
        }
    }

    /// A single receipt query.
    pub async fn status(&self, operation_hash: H256) -> Result<ReceiptStatus, RelayError> {
        self.relay.query_receipt(operation_hash).await
    }

    async fn poll(&self, operation_hash: H256) -> WaitOutcome {
        let mut failures = 0;
        loop {
            let delay = match self.relay.query_receipt(operation_hash).await {
                Ok(ReceiptStatus::Terminal(receipt)) => return Self::resolve(receipt),
                Ok(status) => {
                    debug!(?status, "Operation not yet included");
                    failures = 0;
                    self.poll_interval
                }
                // Only the deadline ends the wait; errors back off.
                Err(err) => {
                    failures += 1;
                    let backoff = self.retry.backoff(failures);
                    warn!(?err, failures, ?backoff, "Receipt query failed");
                    self.poll_interval.saturating_add(backoff)
                }
            };
            sleep(delay).await;
        }
    }

    fn resolve(receipt: OperationReceipt) -> WaitOutcome {
        if receipt.success {
            info!(block = ?receipt.block.block_number, "Operation confirmed");
            return WaitOutcome::Confirmed(receipt);
        }
        let reason = receipt
            .revert_reason
            .clone()
            .unwrap_or_else(|| "execution reverted".to_owned());
        warn!(%reason, "Operation reverted");
        WaitOutcome::Reverted { receipt, reason }
    }
}
