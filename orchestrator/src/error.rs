use account_core::{
    Address, ConfigurationError, LedgerError, RelayError, SignerError, SponsorError, H256, U256,
};

/// Errors surfaced by the orchestration layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrchestratorError {
    /// Missing or malformed configuration. Fatal.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    /// The owner declined to sign, or the signer could not be reached
    #[error(transparent)]
    Signer(#[from] SignerError),
    /// The sponsor declined the operation. Not retried.
    #[error("Sponsor rejected operation: {0}")]
    SponsorRejected(String),
    /// The relay refused the operation, or stayed unreachable through every
    /// retry
    #[error("Relay rejected operation: {0}")]
    RelayRejected(String),
    /// Another operation for the account is still between build and
    /// resolution. Retry once it resolves.
    #[error("Nonce {pending} of account {account:?} is still in flight")]
    NonceConflict {
        /// Account the conflict is on
        account: Address,
        /// Nonce currently reserved
        pending: U256,
    },
    /// The operation did not reach a terminal state in time. It may still
    /// land; check its status before resubmitting.
    #[error("Operation {0:?} is unconfirmed; check its status later")]
    ReceiptTimeout(H256),
    /// The operation was included and its execution reverted
    #[error("Operation {operation_hash:?} reverted: {reason}")]
    Reverted {
        /// Hash of the reverted operation
        operation_hash: H256,
        /// On-chain reason, when one was reported
        reason: String,
    },
    /// A ledger read failed
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    /// The plan was cancelled before the current step was submitted
    #[error("Plan cancelled before submission")]
    Cancelled,
    /// No account session is established
    #[error("No account session; connect an owner first")]
    NotConnected,
}

/// Whether an error is a transient fault worth retrying.
pub trait IsRetryable {
    /// Checks if the error is retryable
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for RelayError {
    fn is_retryable(&self) -> bool {
        // a garbled body is usually a gateway error page, not an answer
        matches!(
            self,
            RelayError::Transport(_) | RelayError::MalformedResponse(_)
        )
    }
}

impl IsRetryable for SponsorError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            SponsorError::Transport(_) | SponsorError::MalformedResponse(_)
        )
    }
}

impl IsRetryable for LedgerError {
    fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::Transport(_))
    }
}

impl From<SponsorError> for OrchestratorError {
    fn from(err: SponsorError) -> Self {
        match err {
            SponsorError::Rejected(rejection) => {
                OrchestratorError::SponsorRejected(rejection.to_string())
            }
            other => OrchestratorError::SponsorRejected(other.to_string()),
        }
    }
}

impl From<RelayError> for OrchestratorError {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::Rejected(rejection) => OrchestratorError::RelayRejected(rejection.to_string()),
            other => OrchestratorError::RelayRejected(other.to_string()),
        }
    }
}
