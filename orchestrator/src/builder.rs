use std::sync::Arc;

use account_core::{Address, Bytes, LedgerReader, Operation, U256};
use tracing::{info, instrument, warn};

use crate::error::OrchestratorError;
use crate::nonce::NonceLease;
use crate::session::AccountSession;

/// Assembles unsigned operations for an account session.
#[derive(Debug, Clone)]
pub struct OperationBuilder {
    ledger: Arc<dyn LedgerReader>,
}

impl OperationBuilder {
    /// A builder reading fee caps from `ledger`
    pub fn new(ledger: Arc<dyn LedgerReader>) -> Self {
        Self { ledger }
    }

    /// Build an unsigned operation calling `target` with `calldata`.
    ///
    /// The operation gets the account's next nonce. The nonce stays taken
    /// until the returned lease is committed or dropped; building again for
    /// the same account before that fails with `NonceConflict`.
    #[instrument(skip(self, session, calldata), fields(account = ?session.account()))]
    pub async fn build(
        &self,
        session: &Arc<AccountSession>,
        target: Address,
        calldata: Bytes,
        value: U256,
    ) -> Result<(Operation, NonceLease), OrchestratorError> {
        let nonce = session.nonces().take(session.account())?;
        let lease = NonceLease::new(session.clone(), nonce);

        // the lease frees the nonce if this read fails
        let fees = self.ledger.fee_estimate().await?;

        let mut operation = Operation::new(session.account(), target, calldata, value, nonce);
        operation.fees = fees;
        operation.init = session.init().cloned();
        info!(?nonce, with_init = operation.init.is_some(), "Built operation");
        Ok((operation, lease))
    }

    /// Reconcile the local nonce counter with the entry point. Failures are
    /// logged; the local counter stays authoritative.
    pub async fn sync_nonce(&self, session: &AccountSession) {
        match self
            .ledger
            .account_nonce(session.account(), session.entry_point())
            .await
        {
            Ok(ledger_nonce) => session.nonces().observe_ledger(ledger_nonce),
            Err(err) => warn!(?err, "Could not read account nonce from ledger"),
        }
    }
}
