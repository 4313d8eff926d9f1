use std::sync::Arc;

use account_core::{
    Address, LedgerReader, OwnerSigner, ReceiptStatus, RelayProvider, SponsorProvider, H256, U256,
};
use async_trait::async_trait;
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::cache::{BalanceSnapshot, SessionCache};
use crate::config::OrchestratorConfig;
use crate::error::OrchestratorError;
use crate::plan::{Intent, TransactionPlan};
use crate::quote::{SwapQuote, SwapQuoter};
use crate::receipt::ReceiptWaiter;
use crate::sequencer::{PlanOutcome, Sequencer};
use crate::session::{AccountSession, OwnerIdentity};

/// What callers of the orchestration layer can do once an owner is
/// connected.
#[async_trait]
pub trait Entrypoint {
    /// Decompose `intent` into a plan and run it for the connected account.
    async fn execute(
        &self,
        intent: &Intent,
        cancel: &CancellationToken,
    ) -> Result<PlanOutcome, OrchestratorError>;

    /// Balance of the connected account in `token`
    async fn balance(&self, token: Address) -> Result<BalanceSnapshot, OrchestratorError>;

    /// One receipt query for a previously submitted operation
    async fn check_status(&self, operation_hash: H256) -> Result<ReceiptStatus, OrchestratorError>;
}

/// The orchestration layer wired to concrete relay, sponsor and ledger
/// endpoints, with at most one connected owner.
#[derive(Debug)]
pub struct Orchestrator {
    config: OrchestratorConfig,
    ledger: Arc<dyn LedgerReader>,
    cache: Arc<SessionCache>,
    sequencer: Sequencer,
    waiter: ReceiptWaiter,
    quoter: SwapQuoter,
    session: RwLock<Option<Arc<AccountSession>>>,
}

impl Orchestrator {
    /// Validate `config` and wire the components. A missing project
    /// identifier is fatal here.
    pub fn new(
        config: OrchestratorConfig,
        relay: Arc<dyn RelayProvider>,
        sponsor: Arc<dyn SponsorProvider>,
        ledger: Arc<dyn LedgerReader>,
    ) -> Result<Self, OrchestratorError> {
        config.validate()?;
        let cache = Arc::new(SessionCache::new(ledger.clone()));
        let sequencer = Sequencer::from_config(
            &config,
            relay.clone(),
            sponsor,
            ledger.clone(),
            cache.clone(),
        );
        Ok(Self {
            waiter: ReceiptWaiter::new(relay, config.receipt_poll_interval, config.relay_retry),
            quoter: SwapQuoter::new(ledger.clone()),
            config,
            ledger,
            cache,
            sequencer,
            session: RwLock::new(None),
        })
    }

    /// The active configuration
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Establish the session for `signer`'s account, replacing any other
    /// session. Reconnecting the same owner keeps the existing session.
    #[instrument(skip_all, fields(owner = ?signer.address()))]
    pub async fn connect(
        &self,
        signer: Arc<dyn OwnerSigner>,
    ) -> Result<Arc<AccountSession>, OrchestratorError> {
        if let Some(session) = self.session() {
            if session.owner().address() == signer.address() {
                return Ok(session);
            }
        }
        let session = Arc::new(
            AccountSession::establish(OwnerIdentity::new(signer), &self.config, self.ledger.as_ref())
                .await?,
        );
        self.disconnect();
        self.cache.attach(&session);
        *self.session.write() = Some(session.clone());
        info!(account = ?session.account(), "Connected");
        Ok(session)
    }

    /// Tear down the current session, if any.
    pub fn disconnect(&self) {
        if let Some(session) = self.session.write().take() {
            self.cache.detach();
            info!(account = ?session.account(), "Disconnected");
        }
    }

    /// The connected session
    pub fn session(&self) -> Option<Arc<AccountSession>> {
        self.session.read().clone()
    }

    fn require_session(&self) -> Result<Arc<AccountSession>, OrchestratorError> {
        self.session().ok_or(OrchestratorError::NotConnected)
    }

    /// Run an already decomposed plan for the connected account.
    pub async fn execute_plan(
        &self,
        plan: &TransactionPlan,
        cancel: &CancellationToken,
    ) -> Result<PlanOutcome, OrchestratorError> {
        let session = self.require_session()?;
        Ok(self.sequencer.execute(&session, plan, cancel).await)
    }

    /// Quote a router swap; see [`SwapQuoter::quote`].
    pub async fn quote_swap(
        &self,
        router: Address,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
        slippage_bps: u64,
    ) -> Result<SwapQuote, OrchestratorError> {
        self.quoter
            .quote(router, token_in, token_out, amount_in, slippage_bps)
            .await
    }
}

#[async_trait]
impl Entrypoint for Orchestrator {
    async fn execute(
        &self,
        intent: &Intent,
        cancel: &CancellationToken,
    ) -> Result<PlanOutcome, OrchestratorError> {
        let session = self.require_session()?;
        let plan = TransactionPlan::from_intent(intent, session.account());
        info!(steps = plan.len(), "Executing intent");
        Ok(self.sequencer.execute(&session, &plan, cancel).await)
    }

    async fn balance(&self, token: Address) -> Result<BalanceSnapshot, OrchestratorError> {
        let session = self.require_session()?;
        let (cache, account) = (&self.cache, session.account());
        Ok(self
            .config
            .relay_retry
            .run("balance", || cache.read(token, account))
            .await?)
    }

    async fn check_status(&self, operation_hash: H256) -> Result<ReceiptStatus, OrchestratorError> {
        let waiter = &self.waiter;
        Ok(self
            .config
            .relay_retry
            .run("check_status", || waiter.status(operation_hash))
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use account_core::{ConfigurationError, LedgerError, TokenAmount, H160};
    use account_test::{FakeChain, FakeSigner, MockLedger};
    use mockall::Sequence;

    use super::*;
    use crate::retry::RetryPolicy;

    const TOKEN: Address = H160([0xaa; 20]);

    fn orchestrator(chain: &Arc<FakeChain>) -> Orchestrator {
        let config = OrchestratorConfig {
            relay_retry: RetryPolicy::new(2, Duration::from_millis(10)),
            ..OrchestratorConfig::new("project")
        };
        Orchestrator::new(config, chain.clone(), chain.clone(), chain.clone()).unwrap()
    }

    fn signer(byte: u8) -> Arc<dyn OwnerSigner> {
        Arc::new(FakeSigner::new(Address::repeat_byte(byte)))
    }

    #[test]
    fn missing_project_id_is_fatal_at_construction() {
        let chain = Arc::new(FakeChain::default());
        let config = OrchestratorConfig {
            project_id: Some(String::new()),
            ..OrchestratorConfig::new("project")
        };
        let err = Orchestrator::new(config, chain.clone(), chain.clone(), chain).unwrap_err();
        assert_eq!(
            err,
            OrchestratorError::Configuration(ConfigurationError::MissingProjectId)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn intents_require_a_connected_owner() {
        let chain = Arc::new(FakeChain::default());
        let orchestrator = orchestrator(&chain);
        let intent = Intent::Faucet {
            mints: vec![(TOKEN, U256::one())],
        };
        let err = orchestrator
            .execute(&intent, &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err, OrchestratorError::NotConnected);
        assert_eq!(
            orchestrator.balance(TOKEN).await.unwrap_err(),
            OrchestratorError::NotConnected
        );
    }

    #[tokio::test(start_paused = true)]
    async fn faucet_then_balance_and_status() {
        let chain = Arc::new(FakeChain::default());
        chain.add_token(TOKEN, 6);
        let orchestrator = orchestrator(&chain);
        let session = orchestrator.connect(signer(0x0a)).await.unwrap();

        let before = orchestrator.balance(TOKEN).await.unwrap();
        assert_eq!(before.amount, U256::zero());

        let outcome = orchestrator
            .execute(
                &Intent::Faucet {
                    mints: vec![(TOKEN, U256::from(2_500_000))],
                },
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert!(outcome.is_completed());

        let after = orchestrator.balance(TOKEN).await.unwrap();
        assert_eq!(after.display_amount(), "2.5");
        assert_eq!(after.owner, session.account());

        let hash = outcome.steps[0].operation_hash.unwrap();
        assert!(matches!(
            orchestrator.check_status(hash).await.unwrap(),
            ReceiptStatus::Terminal(receipt) if receipt.success
        ));
        assert_eq!(
            orchestrator.check_status(H256::repeat_byte(0x42)).await.unwrap(),
            ReceiptStatus::NotFound
        );
    }

    #[tokio::test]
    async fn reconnect_and_disconnect() {
        let chain = Arc::new(FakeChain::default());
        let orchestrator = orchestrator(&chain);

        let first = orchestrator.connect(signer(0x0a)).await.unwrap();
        let again = orchestrator.connect(signer(0x0a)).await.unwrap();
        assert!(Arc::ptr_eq(&first, &again));

        let other = orchestrator.connect(signer(0x0b)).await.unwrap();
        assert_ne!(other.account(), first.account());

        orchestrator.disconnect();
        assert!(orchestrator.session().is_none());
        // neither the orchestrator nor its cache keeps a session alive
        assert_eq!(Arc::strong_count(&first), 2);
        assert_eq!(Arc::strong_count(&other), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn balance_reads_retry_transport_faults() {
        let chain = Arc::new(FakeChain::default());
        let mut ledger = MockLedger::new();
        ledger.expect_account_nonce().returning(|_, _| Ok(U256::zero()));
        ledger.expect_is_deployed().returning(|_| Ok(true));
        let mut seq = Sequence::new();
        ledger
            .expect_token_balance()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(LedgerError::Transport("connection reset".into())));
        ledger
            .expect_token_balance()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(TokenAmount::new(U256::from(42_000_000), 6)));

        let config = OrchestratorConfig {
            relay_retry: RetryPolicy::new(2, Duration::from_millis(10)),
            ..OrchestratorConfig::new("project")
        };
        let orchestrator =
            Orchestrator::new(config, chain.clone(), chain, Arc::new(ledger)).unwrap();
        orchestrator.connect(signer(0x0a)).await.unwrap();

        let snapshot = orchestrator.balance(TOKEN).await.unwrap();
        assert_eq!(snapshot.display_amount(), "42");
    }
}
