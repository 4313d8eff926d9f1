use std::sync::Arc;

use account_base::{LocalKeySigner, Settings};
use account_core::{to_base_units, to_display_units, Address, ReceiptStatus, U256};
use color_eyre::{
    eyre::{eyre, Context},
    Result,
};
use orchestrator::{
    CancellationToken, Entrypoint, Intent, Orchestrator, OrchestratorError, PlanOutcome,
    PlanStatus,
};
use tracing::info;

use crate::args::{Args, Command};

pub async fn run(args: Args, settings: &Settings, orchestrator: &Orchestrator) -> Result<()> {
    if let Command::Status { hash } = args.command {
        return status(settings, orchestrator, hash).await;
    }

    let key = args
        .owner_key
        .as_deref()
        .ok_or_else(|| eyre!("An owner key is required (--owner-key or SA_OWNER_KEY)"))?;
    let signer = Arc::new(LocalKeySigner::from_private_key(key)?);
    let session = orchestrator.connect(signer).await?;

    match args.command {
        Command::Address => {
            println!("Owner  : {:?}", session.owner().address());
            println!("Account: {:?}", session.account());
            println!("Deployed: {}", session.is_deployed());
        }
        Command::Balance { token } => {
            let snapshot = orchestrator.balance(token).await?;
            println!("{} ({:?})", snapshot.display_amount(), token);
        }
        Command::Swap {
            router,
            token_in,
            token_out,
            amount,
            min_out,
            slippage_bps,
        } => {
            let amount_in = base_units(orchestrator, token_in, &amount).await?;
            let min_out = match min_out {
                Some(min_out) => base_units(orchestrator, token_out, &min_out).await?,
                None => {
                    let quote = orchestrator
                        .quote_swap(router, token_in, token_out, amount_in, slippage_bps)
                        .await?;
                    info!(expected = %quote.expected_out, min_out = %quote.min_out, "Quoted swap");
                    quote.min_out
                }
            };
            let intent = Intent::Swap {
                router,
                token_in,
                token_out,
                amount_in,
                min_out,
            };
            execute(settings, orchestrator, &intent).await?;
        }
        Command::Transfer { token, to, amount } => {
            let amount = base_units(orchestrator, token, &amount).await?;
            execute(settings, orchestrator, &Intent::Transfer { token, to, amount }).await?;
        }
        Command::Faucet { tokens, amount } => {
            let mut mints = Vec::with_capacity(tokens.len());
            for token in tokens {
                mints.push((token, base_units(orchestrator, token, &amount).await?));
            }
            execute(settings, orchestrator, &Intent::Faucet { mints }).await?;
        }
        Command::Status { .. } => {}
    }

    orchestrator.disconnect();
    Ok(())
}

async fn base_units(orchestrator: &Orchestrator, token: Address, amount: &str) -> Result<U256> {
    let decimals = orchestrator
        .balance(token)
        .await
        .with_context(|| format!("Failed to read token {token:?}"))?
        .decimals;
    Ok(to_base_units(amount, decimals)?)
}

async fn execute(settings: &Settings, orchestrator: &Orchestrator, intent: &Intent) -> Result<()> {
    let outcome = orchestrator
        .execute(intent, &CancellationToken::new())
        .await?;
    report(settings, &outcome);

    match outcome.status {
        PlanStatus::Completed => Ok(()),
        PlanStatus::Aborted {
            step,
            reason,
            partial,
        } => {
            if partial {
                println!("Earlier steps were confirmed and remain in effect.");
            }
            if let OrchestratorError::ReceiptTimeout(hash) = &reason {
                println!("The operation may still land: smart-account status {hash:?}");
            }
            Err(eyre!("Step {step} failed: {reason}"))
        }
    }
}

fn report(settings: &Settings, outcome: &PlanOutcome) {
    for step in &outcome.steps {
        let hash = step
            .operation_hash
            .map(|h| format!("{h:?}"))
            .unwrap_or_else(|| "-".into());
        match &step.receipt {
            Some(receipt) => println!(
                "[{}] {} {} {} {}",
                step.index,
                step.kind,
                if receipt.success { "confirmed" } else { "reverted" },
                hash,
                settings.explorer_tx_url(receipt.block.transaction_hash),
            ),
            None => println!("[{}] {} not confirmed {}", step.index, step.kind, hash),
        }
    }
}

async fn status(
    settings: &Settings,
    orchestrator: &Orchestrator,
    hash: account_core::H256,
) -> Result<()> {
    match orchestrator.check_status(hash).await? {
        ReceiptStatus::NotFound => println!("Unknown to the relay"),
        ReceiptStatus::Pending => println!("Pending"),
        ReceiptStatus::Terminal(receipt) => {
            let verdict = if receipt.success {
                "Confirmed".to_owned()
            } else {
                format!(
                    "Reverted: {}",
                    receipt.revert_reason.as_deref().unwrap_or("no reason given")
                )
            };
            println!("{verdict} in block {}", receipt.block.block_number);
            println!("Fee paid by sponsor: {} ETH", to_display_units(receipt.actual_gas_cost, 18));
            println!("{}", settings.explorer_tx_url(receipt.block.transaction_hash));
        }
    }
    Ok(())
}
