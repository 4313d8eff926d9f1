use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use account_core::{
    Bytes, Operation, PendingHandle, ReceiptStatus, RelayError, RelayProvider, SignedOperation,
};
use chrono::Utc;
use tracing::{error, info, instrument, warn};

use crate::error::{IsRetryable, OrchestratorError};
use crate::retry::RetryPolicy;
use crate::session::AccountSession;

/// Signs operations with the session owner and forwards them to the relay.
#[derive(Debug, Clone)]
pub struct Submitter {
    relay: Arc<dyn RelayProvider>,
    retry: RetryPolicy,
}

impl Submitter {
    /// A submitter for `relay`, retrying transport faults with `retry`
    pub fn new(relay: Arc<dyn RelayProvider>, retry: RetryPolicy) -> Self {
        Self { relay, retry }
    }

    /// Sign `operation` and hand it to the relay.
    ///
    /// Once this returns a handle the operation is committed: it cannot be
    /// recalled and must be awaited.
    #[instrument(skip_all, fields(account = ?session.account(), nonce = ?operation.nonce))]
    pub async fn submit(
        &self,
        session: &AccountSession,
        operation: Operation,
    ) -> Result<PendingHandle, OrchestratorError> {
        let nonce = operation.nonce;
        let digest = operation.hash(session.entry_point(), session.chain_id());
        let signature = session.owner().signer().sign_digest(digest).await?;
        let signed = SignedOperation::new(operation, Bytes::from(signature.to_vec()), digest);

        let ambiguous = &AtomicBool::new(false);
        let (relay, signed_ref, entry_point) = (&self.relay, &signed, session.entry_point());
        let result = self
            .retry
            .run("submit_operation", || async move {
                let result = relay.submit_operation(signed_ref, entry_point).await;
                if matches!(&result, Err(err) if err.is_retryable()) {
                    ambiguous.store(true, Ordering::Relaxed);
                }
                result
            })
            .await;

        let hash = match result {
            Ok(hash) => hash,
            // An earlier attempt may have reached the relay before its
            // response was lost. The nonce stays taken if the relay knows it.
            Err(err) if ambiguous.load(Ordering::Relaxed) => {
                if self.already_known(&signed).await {
                    warn!(?err, "Relay holds the operation despite the failed submission");
                    signed.hash()
                } else {
                    error!(?err, "Relay did not accept operation");
                    return Err(err.into());
                }
            }
            Err(err) => {
                error!(?err, "Relay did not accept operation");
                return Err(err.into());
            }
        };

        if hash != signed.hash() {
            warn!(relay_hash = ?hash, local_hash = ?signed.hash(), "Relay returned a different operation hash");
        }
        info!(operation_hash = ?hash, "Operation submitted");
        Ok(PendingHandle::new(hash, nonce, Utc::now()))
    }

    async fn already_known(&self, signed: &SignedOperation) -> bool {
        let (relay, hash) = (&self.relay, signed.hash());
        matches!(
            self.retry
                .run("query_receipt", || relay.query_receipt(hash))
                .await,
            Ok(ReceiptStatus::Pending | ReceiptStatus::Terminal(_))
        )
    }
}
