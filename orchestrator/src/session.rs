use std::fmt::{self, Debug};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use account_core::{AccountInit, Address, LedgerReader, OwnerSigner};
use parking_lot::{Mutex, MutexGuard};
use tokio::sync::{Mutex as AsyncMutex, MutexGuard as AsyncMutexGuard};
use tracing::{info, instrument};

use crate::config::OrchestratorConfig;
use crate::error::OrchestratorError;
use crate::nonce::NonceTracker;

/// The owner's signing capability together with its public address.
#[derive(Clone)]
pub struct OwnerIdentity {
    signer: Arc<dyn OwnerSigner>,
    address: Address,
}

impl OwnerIdentity {
    /// Wrap a signer. The address is read once and fixed for the session.
    pub fn new(signer: Arc<dyn OwnerSigner>) -> Self {
        let address = signer.address();
        Self { signer, address }
    }

    /// Owner address
    pub fn address(&self) -> Address {
        self.address
    }

    /// Signing capability
    pub fn signer(&self) -> &dyn OwnerSigner {
        self.signer.as_ref()
    }
}

impl Debug for OwnerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnerIdentity")
            .field("address", &self.address)
            .finish()
    }
}

/// A live smart account bound to one owner.
///
/// Created once per authenticated owner and dropped on disconnect. Holds the
/// account's nonce bookkeeping and the exclusion region that serializes
/// plans for the account.
#[derive(Debug)]
pub struct AccountSession {
    owner: OwnerIdentity,
    account: Address,
    protocol_version: String,
    entry_point: Address,
    chain_id: u64,
    init: AccountInit,
    deployed: AtomicBool,
    nonces: Mutex<NonceTracker>,
    in_flight: AsyncMutex<()>,
}

impl AccountSession {
    /// Derive the owner's account and read its nonce and deployment state.
    #[instrument(skip_all, fields(owner = ?owner.address()))]
    pub async fn establish(
        owner: OwnerIdentity,
        config: &OrchestratorConfig,
        ledger: &dyn LedgerReader,
    ) -> Result<Self, OrchestratorError> {
        config.validate()?;
        let deriver = config.deriver();
        let account = deriver.derive(owner.address(), &config.account_version, config.entry_point)?;
        let init = deriver.account_init(owner.address(), &config.account_version);

        let nonce = ledger.account_nonce(account, config.entry_point).await?;
        let deployed = ledger.is_deployed(account).await?;
        info!(?account, ?nonce, deployed, "Account session established");

        Ok(Self {
            owner,
            account,
            protocol_version: config.account_version.clone(),
            entry_point: config.entry_point,
            chain_id: config.chain_id,
            init,
            deployed: AtomicBool::new(deployed),
            nonces: Mutex::new(NonceTracker::new(nonce)),
            in_flight: AsyncMutex::new(()),
        })
    }

    /// Owner of the account
    pub fn owner(&self) -> &OwnerIdentity {
        &self.owner
    }

    /// The account address
    pub fn account(&self) -> Address {
        self.account
    }

    /// Account implementation version
    pub fn protocol_version(&self) -> &str {
        &self.protocol_version
    }

    /// Entry point validating the account's operations
    pub fn entry_point(&self) -> Address {
        self.entry_point
    }

    /// Chain the account lives on
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Whether the account has code on the ledger
    pub fn is_deployed(&self) -> bool {
        self.deployed.load(Ordering::Acquire)
    }

    /// Deployment data, needed until the account's first operation lands
    pub fn init(&self) -> Option<&AccountInit> {
        (!self.is_deployed()).then_some(&self.init)
    }

    pub(crate) fn mark_deployed(&self) {
        self.deployed.store(true, Ordering::Release);
    }

    /// Nonce bookkeeping. Never held across an await point.
    pub fn nonces(&self) -> MutexGuard<'_, NonceTracker> {
        self.nonces.lock()
    }

    /// Enter the account's exclusion region, failing if another plan holds it.
    pub(crate) fn try_enter(&self) -> Result<AsyncMutexGuard<'_, ()>, OrchestratorError> {
        self.in_flight
            .try_lock()
            .map_err(|_| OrchestratorError::NonceConflict {
                account: self.account,
                pending: {
                    let nonces = self.nonces();
                    nonces.taken().unwrap_or_else(|| nonces.next())
                },
            })
    }
}

#[cfg(test)]
mod tests {
    use account_test::{FakeChain, FakeSigner};

    use super::*;

    #[tokio::test]
    async fn establish_derives_and_reads_nonce() {
        let chain = FakeChain::default();
        let config = OrchestratorConfig::new("project");
        let owner = OwnerIdentity::new(Arc::new(FakeSigner::new(Address::repeat_byte(0x0a))));
        let expected = config
            .deriver()
            .derive(owner.address(), &config.account_version, config.entry_point)
            .unwrap();
        chain.set_nonce(expected, 12u64.into());

        let session = AccountSession::establish(owner, &config, &chain).await.unwrap();
        assert_eq!(session.account(), expected);
        assert_eq!(session.nonces().next(), 12u64.into());
        assert!(!session.is_deployed());
        assert!(session.init().is_some());

        session.mark_deployed();
        assert!(session.init().is_none());
    }

    #[tokio::test]
    async fn establish_requires_project_id() {
        let chain = FakeChain::default();
        let config = OrchestratorConfig {
            project_id: None,
            ..OrchestratorConfig::new("project")
        };
        let owner = OwnerIdentity::new(Arc::new(FakeSigner::new(Address::repeat_byte(0x0a))));
        let err = AccountSession::establish(owner, &config, &chain)
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::Configuration(_)));
    }

    #[tokio::test]
    async fn second_plan_cannot_enter() {
        let chain = FakeChain::default();
        let owner = OwnerIdentity::new(Arc::new(FakeSigner::new(Address::repeat_byte(0x0a))));
        let session = AccountSession::establish(owner, &OrchestratorConfig::new("p"), &chain)
            .await
            .unwrap();
        let _guard = session.try_enter().unwrap();
        assert!(matches!(
            session.try_enter(),
            Err(OrchestratorError::NonceConflict { .. })
        ));
    }
}
