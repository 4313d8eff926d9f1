use std::sync::Arc;
use std::time::Duration;

use account_core::{LedgerReader, PendingHandle, RelayProvider, SponsorContext, SponsorProvider};
use derive_new::new;
use itertools::Itertools;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::builder::OperationBuilder;
use crate::cache::SessionCache;
use crate::config::OrchestratorConfig;
use crate::error::OrchestratorError;
use crate::plan::{PlannedStep, TransactionPlan};
use crate::receipt::{ReceiptWaiter, WaitOutcome};
use crate::session::AccountSession;
use crate::sponsor::SponsorClient;
use crate::submitter::Submitter;

pub use state::*;

mod state;


/// Runs transaction plans one step at a time: build, sponsor, submit, await.
///
/// A step is only built once the previous one confirmed. The first failure
/// aborts the plan; the remaining steps are never built. Plans for the same
/// account are mutually exclusive for their whole duration.
#[derive(Debug, new)]
pub struct Sequencer {
    builder: OperationBuilder,
    sponsor: SponsorClient,
    submitter: Submitter,
    waiter: ReceiptWaiter,
    cache: Arc<SessionCache>,
    receipt_timeout: Duration,
    max_await_rounds: usize,
}

struct PlanRun {
    history: Vec<SequencerState>,
    steps: Vec<StepReport>,
}

impl PlanRun {
    fn new() -> Self {
        Self {
            history: vec![SequencerState::Idle],
            steps: Vec::new(),
        }
    }

    fn enter(&mut self, state: SequencerState) {
        self.history.push(state);
    }

    fn current(&mut self) -> Option<&mut StepReport> {
        self.steps.last_mut()
    }

    fn partial(&self) -> bool {
        self.steps.iter().any(StepReport::confirmed)
    }

    fn finish(mut self, status: PlanStatus) -> PlanOutcome {
        self.enter(match &status {
            PlanStatus::Completed => SequencerState::Completed,
            PlanStatus::Aborted { step, .. } => SequencerState::Aborted(*step),
        });
        PlanOutcome {
            status,
            steps: self.steps,
            history: self.history,
        }
    }
}

/// Cancellation is honored only before the current step is submitted.
fn ensure_not_cancelled(cancel: &CancellationToken) -> Result<(), OrchestratorError> {
    if cancel.is_cancelled() {
        return Err(OrchestratorError::Cancelled);
    }
    Ok(())
}

impl Sequencer {
    /// Wire a sequencer from configuration and the external interfaces.
    pub fn from_config(
        config: &OrchestratorConfig,
        relay: Arc<dyn RelayProvider>,
        sponsor: Arc<dyn SponsorProvider>,
        ledger: Arc<dyn LedgerReader>,
        cache: Arc<SessionCache>,
    ) -> Self {
        let context = SponsorContext::new(config.chain_id, config.entry_point);
        Self::new(
            OperationBuilder::new(ledger),
            SponsorClient::new(sponsor, context, config.relay_retry),
            Submitter::new(relay.clone(), config.relay_retry),
            ReceiptWaiter::new(relay, config.receipt_poll_interval, config.relay_retry),
            cache,
            config.receipt_timeout,
            config.max_await_rounds,
        )
    }

    /// Run `plan` for `session` until it completes or a step fails.
    ///
    /// Step failures never surface as `Err`: the returned outcome carries a
    /// single terminal status, and says whether earlier steps already took
    /// effect.
    #[instrument(skip_all, fields(account = ?session.account(), steps = plan.len()))]
    pub async fn execute(
        &self,
        session: &Arc<AccountSession>,
        plan: &TransactionPlan,
        cancel: &CancellationToken,
    ) -> PlanOutcome {
        let mut run = PlanRun::new();

        let _exclusive = match session.try_enter() {
            Ok(guard) => guard,
            Err(reason) => {
                warn!(?reason, "Another plan is running for this account");
                return run.finish(PlanStatus::Aborted {
                    step: 0,
                    reason,
                    partial: false,
                });
            }
        };
        self.builder.sync_nonce(session).await;

        for (index, step) in plan.steps().iter().enumerate() {
            if let Err(reason) = self.run_step(session, index, step, cancel, &mut run).await {
                let partial = run.partial();
                error!(step = index, kind = %step.kind, ?reason, partial, "Plan aborted");
                if partial {
                    self.cache.invalidate(session.account());
                }
                return run.finish(PlanStatus::Aborted {
                    step: index,
                    reason,
                    partial,
                });
            }
            run.enter(SequencerState::Advance(index));
        }

        if !plan.is_empty() {
            let tokens = plan.referenced_tokens().iter().map(|t| format!("{t:?}")).join(",");
            let counter = self.cache.invalidate(session.account());
            info!(%tokens, refresh_counter = counter, "Plan completed");
        }
        run.finish(PlanStatus::Completed)
    }

    async fn run_step(
        &self,
        session: &Arc<AccountSession>,
        index: usize,
        step: &PlannedStep,
        cancel: &CancellationToken,
        run: &mut PlanRun,
    ) -> Result<(), OrchestratorError> {
        run.enter(SequencerState::Building(index));
        run.steps.push(StepReport::new(index, step.kind));
        ensure_not_cancelled(cancel)?;
        let (operation, lease) = self
            .builder
            .build(session, step.target, step.calldata.clone(), step.value)
            .await?;
        if let Some(report) = run.current() {
            report.nonce = Some(lease.nonce());
        }

        run.enter(SequencerState::Sponsoring(index));
        ensure_not_cancelled(cancel)?;
        let operation = self.sponsor.sponsor(operation).await?;
        // last point where the step can be dropped without a ledger effect
        ensure_not_cancelled(cancel)?;

        run.enter(SequencerState::Submitting(index));
        let handle = self.submitter.submit(session, operation).await?;
        lease.commit();
        if let Some(report) = run.current() {
            report.operation_hash = Some(handle.operation_hash);
        }

        self.await_resolution(session, &handle, run).await
    }

    async fn await_resolution(
        &self,
        session: &AccountSession,
        handle: &PendingHandle,
        run: &mut PlanRun,
    ) -> Result<(), OrchestratorError> {
        let index = run.steps.len().saturating_sub(1);
        for round in 1..=self.max_await_rounds {
            run.enter(SequencerState::Awaiting(index));
            match self.waiter.wait(handle, self.receipt_timeout).await {
                WaitOutcome::Confirmed(receipt) => {
                    session.mark_deployed();
                    if let Some(report) = run.current() {
                        report.receipt = Some(receipt);
                    }
                    return Ok(());
                }
                WaitOutcome::Reverted { receipt, reason } => {
                    // validation ran, so the account exists now
                    session.mark_deployed();
                    if let Some(report) = run.current() {
                        report.receipt = Some(receipt);
                    }
                    return Err(OrchestratorError::Reverted {
                        operation_hash: handle.operation_hash,
                        reason,
                    });
                }
                WaitOutcome::TimedOut => {
                    warn!(
                        operation_hash = ?handle.operation_hash,
                        round,
                        max_rounds = self.max_await_rounds,
                        "Operation still unconfirmed"
                    );
                }
            }
        }
        Err(OrchestratorError::ReceiptTimeout(handle.operation_hash))
    }
}
