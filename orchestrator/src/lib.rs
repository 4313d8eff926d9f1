//! Orchestration of sponsored smart-account operations.
//!
//! An [`Orchestrator`] connects an owner to its smart account and runs
//! [`TransactionPlan`]s for it. Each step of a plan is built with the
//! account's next nonce, sponsored, signed, relayed and awaited before the
//! next one starts; the first failure aborts the plan with a single terminal
//! status. Confirmed plans invalidate the account's cached balances.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used, clippy::panic)]

pub use builder::OperationBuilder;
pub use cache::{BalanceSnapshot, SessionCache};
pub use config::OrchestratorConfig;
pub use entrypoint::{Entrypoint, Orchestrator};
pub use error::{IsRetryable, OrchestratorError};
pub use nonce::{NonceLease, NonceTracker};
pub use plan::{Intent, PlannedStep, StepKind, TransactionPlan};
pub use quote::{constant_product_out, SwapQuote, SwapQuoter};
pub use receipt::{ReceiptWaiter, WaitOutcome};
pub use retry::RetryPolicy;
pub use sequencer::{PlanOutcome, PlanStatus, Sequencer, SequencerState, StepReport};
pub use session::{AccountSession, OwnerIdentity};
pub use sponsor::SponsorClient;
pub use submitter::Submitter;
pub use tokio_util::sync::CancellationToken;

mod builder;
mod cache;
mod config;
mod entrypoint;
mod error;
mod nonce;
mod plan;
mod quote;
mod receipt;
mod retry;
mod sequencer;
mod session;
mod sponsor;
mod submitter;
