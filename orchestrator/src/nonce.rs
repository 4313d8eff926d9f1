use std::sync::Arc;

use account_core::{Address, U256};
use tracing::{debug, info, warn};

use crate::error::OrchestratorError;
use crate::session::AccountSession;

/// Nonce bookkeeping for one account.
///
/// At most one nonce is taken at a time. A taken nonce is either committed,
/// once its operation was accepted by the relay, or freed when the operation
/// never left the process, in which case it is handed out again. Committed
/// nonces advance the counter, so assignment is gap-free.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonceTracker {
    next: U256,
    taken: Option<U256>,
}

impl NonceTracker {
    /// Start counting at `next`, usually the entry point's current nonce.
    pub fn new(next: U256) -> Self {
        Self { next, taken: None }
    }

    /// Nonce the next build will get
    pub fn next(&self) -> U256 {
        self.next
    }

    /// Nonce currently taken by an unresolved build
    pub fn taken(&self) -> Option<U256> {
        self.taken
    }

    pub(crate) fn take(&mut self, account: Address) -> Result<U256, OrchestratorError> {
        if let Some(pending) = self.taken {
            warn!(?account, ?pending, "Nonce already taken by an unresolved build");
            return Err(OrchestratorError::NonceConflict { account, pending });
        }
        self.taken = Some(self.next);
        Ok(self.next)
    }

    pub(crate) fn commit(&mut self, nonce: U256) {
        if self.taken == Some(nonce) {
            self.taken = None;
            self.next = nonce.saturating_add(U256::one());
        }
    }

    pub(crate) fn free(&mut self, nonce: U256) {
        if self.taken == Some(nonce) {
            self.taken = None;
        }
    }

    /// Catch up with the ledger when operations were sent from elsewhere.
    /// Never moves the counter backwards.
    pub(crate) fn observe_ledger(&mut self, ledger_nonce: U256) {
        if self.taken.is_none() && ledger_nonce > self.next {
            info!(local = ?self.next, ?ledger_nonce, "Ledger nonce is ahead, adopting it");
            self.next = ledger_nonce;
        }
    }
}

/// A nonce taken for one operation. Frees the nonce when dropped unless
/// [`NonceLease::commit`] was called.
#[derive(Debug)]
pub struct NonceLease {
    session: Arc<AccountSession>,
    nonce: U256,
    committed: bool,
}

impl NonceLease {
    pub(crate) fn new(session: Arc<AccountSession>, nonce: U256) -> Self {
        Self {
            session,
            nonce,
            committed: false,
        }
    }

    /// The leased nonce
    pub fn nonce(&self) -> U256 {
        self.nonce
    }

    /// Mark the nonce as used by a submitted operation.
    pub fn commit(mut self) {
        self.session.nonces().commit(self.nonce);
        self.committed = true;
        debug!(nonce = ?self.nonce, "Nonce committed");
    }
}

impl Drop for NonceLease {
    fn drop(&mut self) {
        if !self.committed {
            self.session.nonces().free(self.nonce);
            debug!(nonce = ?self.nonce, "Nonce freed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_take_conflicts_until_resolved() {
        let account = Address::repeat_byte(0x01);
        let mut tracker = NonceTracker::new(U256::from(4));

        assert_eq!(tracker.take(account), Ok(U256::from(4)));
        assert_eq!(
            tracker.take(account),
            Err(OrchestratorError::NonceConflict {
                account,
                pending: U256::from(4)
            })
        );

        tracker.commit(U256::from(4));
        assert_eq!(tracker.take(account), Ok(U256::from(5)));
    }

    #[test]
    fn freed_nonce_is_reused() {
        let account = Address::repeat_byte(0x01);
        let mut tracker = NonceTracker::new(U256::zero());
        let nonce = tracker.take(account).unwrap();
        tracker.free(nonce);
        assert_eq!(tracker.take(account), Ok(nonce));
    }

    #[test]
    fn ledger_only_moves_counter_forward() {
        let mut tracker = NonceTracker::new(U256::from(7));
        tracker.observe_ledger(U256::from(3));
        assert_eq!(tracker.next(), U256::from(7));
        tracker.observe_ledger(U256::from(9));
        assert_eq!(tracker.next(), U256::from(9));
    }
}
