use account_core::{OperationReceipt, H256, U256};
use serde::Serialize;

use crate::error::OrchestratorError;
use crate::plan::StepKind;

/// States of the plan state machine. The index is the plan step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SequencerState {
    /// Nothing started
    Idle,
    /// Assembling the operation for a step
    Building(usize),
    /// Waiting for the sponsor
    Sponsoring(usize),
    /// Signing and relaying
    Submitting(usize),
    /// Waiting for a terminal receipt
    Awaiting(usize),
    /// Step confirmed; move on
    Advance(usize),
    /// Terminal: the step failed and the rest of the plan was skipped
    Aborted(usize),
    /// Terminal: every step confirmed
    Completed,
}

impl SequencerState {
    /// Whether no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, SequencerState::Aborted(_) | SequencerState::Completed)
    }

    /// Whether the plan may still be cancelled in this state
    pub fn is_cancellable(&self) -> bool {
        matches!(
            self,
            SequencerState::Idle | SequencerState::Building(_) | SequencerState::Sponsoring(_)
        )
    }
}

/// Terminal status of a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanStatus {
    /// Every step confirmed
    Completed,
    /// A step failed and the remaining steps were not built
    Aborted {
        /// Index of the failing step
        step: usize,
        /// Why it failed
        reason: OrchestratorError,
        /// Whether earlier steps already took effect on the ledger
        partial: bool,
    },
}

/// What happened to one attempted step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    /// Position in the plan
    pub index: usize,
    /// What the step does
    pub kind: StepKind,
    /// Nonce the step's operation was built with
    pub nonce: Option<U256>,
    /// Hash of the submitted operation
    pub operation_hash: Option<H256>,
    /// Receipt, once the step reached a terminal ledger status
    pub receipt: Option<OperationReceipt>,
}

impl StepReport {
    pub(crate) fn new(index: usize, kind: StepKind) -> Self {
        Self {
            index,
            kind,
            nonce: None,
            operation_hash: None,
            receipt: None,
        }
    }

    /// Whether the step's operation confirmed successfully
    pub fn confirmed(&self) -> bool {
        self.receipt.as_ref().map_or(false, |r| r.success)
    }
}

/// Result of running a plan: one terminal status plus per-step detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanOutcome {
    /// Terminal status
    pub status: PlanStatus,
    /// Reports for every step that was started, in order
    pub steps: Vec<StepReport>,
    /// Every state the machine passed through
    pub history: Vec<SequencerState>,
}

impl PlanOutcome {
    /// Whether the plan completed
    pub fn is_completed(&self) -> bool {
        self.status == PlanStatus::Completed
    }

    /// Steps whose operations confirmed
    pub fn confirmed_steps(&self) -> impl Iterator<Item = &StepReport> {
        self.steps.iter().filter(|s| s.confirmed())
    }
}
