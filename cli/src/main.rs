//! `smart-account`: drive a sponsored smart account from the command line.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::panic)]

use std::sync::Arc;

use account_base::{load_settings, BundlerClient, NodeLedger, PaymasterClient, Settings};
use clap::Parser;
use color_eyre::Result;
use orchestrator::{Orchestrator, OrchestratorConfig, RetryPolicy};

use crate::args::Args;

mod args;
mod commands;

fn orchestrator_config(settings: &Settings) -> OrchestratorConfig {
    OrchestratorConfig {
        project_id: Some(settings.project_id.clone()),
        entry_point: settings.entry_point,
        factory: settings.factory,
        account_version: settings.account_version.clone(),
        chain_id: settings.chain_id,
        relay_retry: RetryPolicy::new(settings.max_relay_attempts, settings.base_retry),
        receipt_timeout: settings.receipt_timeout,
        receipt_poll_interval: settings.receipt_poll_interval,
        max_await_rounds: settings.max_await_rounds,
    }
}

fn orchestrator(settings: &Settings) -> Result<Orchestrator> {
    let relay = Arc::new(BundlerClient::new(
        settings.relay_url.clone(),
        settings.relay_timeout,
    )?);
    let sponsor = Arc::new(PaymasterClient::new(
        settings.sponsor_url.clone(),
        settings.relay_timeout,
    )?);
    let ledger = Arc::new(NodeLedger::new(
        settings.ledger_url.clone(),
        settings.relay_timeout,
    )?);
    Ok(Orchestrator::new(
        orchestrator_config(settings),
        relay,
        sponsor,
        ledger,
    )?)
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    let settings = load_settings()?;
    settings.tracing.start_tracing()?;

    let orchestrator = orchestrator(&settings)?;
    commands::run(args, &settings, &orchestrator).await
}
