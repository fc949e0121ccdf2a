mod cli;
mod config;
mod domain_events;
mod main_lib;
mod scheduler;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tradeledger_core::ledger::LedgerServiceTrait;
use tradeledger_core::portfolio::compaction::SnapshotCompactionServiceTrait;
use tradeledger_core::portfolio::holdings::HeldPosition;
use tradeledger_core::portfolio::snapshot::SnapshotCaptureServiceTrait;

use cli::{Cli, Commands};
use config::Config;
use main_lib::{build_state, init_tracing, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env().context("Invalid worker configuration")?;
    init_tracing(config.json_logs);
    let state = build_state(&config).await?;

    let result = run_command(&state, &config, cli.command).await;
    state.shutdown().await;
    result
}

async fn run_command(
    state: &Arc<AppState>,
    config: &Config,
    command: Commands,
) -> anyhow::Result<()> {
    match command {
        Commands::Run => {
            tracing::info!("Worker running against {}", state.db_path);
            let capture =
                scheduler::start_capture_scheduler(state.clone(), config.capture_interval);
            let compaction =
                scheduler::start_compaction_scheduler(state.clone(), config.compaction_interval);
            tokio::signal::ctrl_c().await?;
            tracing::info!("Shutting down");
            capture.abort();
            compaction.abort();
            let _ = capture.await;
            let _ = compaction.await;
        }
        Commands::Capture { account } => {
            let changed = match account {
                Some(account_id) => {
                    usize::from(state.capture_service.capture_for_account(&account_id, None).await?)
                }
                None => {
                    state
                        .capture_service
                        .capture_for_all_active_accounts(None)
                        .await?
                }
            };
            println!("{} snapshot(s) changed", changed);
        }
        Commands::Compact { account, dry_run } => {
            let summary = state
                .compaction_service
                .run_compaction(account.as_deref(), dry_run)
                .await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Post(args) => {
            let event = state
                .ledger_service
                .post(&args.account, &args.event_type, args.attributes())
                .await?;
            println!("{}", serde_json::to_string_pretty(&event)?);
        }
        Commands::Verify { account } => {
            let verification = state.ledger_service.verify_account(&account)?;
            println!("{}", serde_json::to_string_pretty(&verification)?);
            if !verification.is_consistent() {
                anyhow::bail!("ledger of account {} has drifted", account);
            }
        }
        Commands::SetPosition {
            account,
            symbol,
            quantity,
            price,
        } => {
            state
                .holdings_repository
                .upsert_position(HeldPosition {
                    account_id: account,
                    symbol,
                    quantity,
                    market_price: price,
                })
                .await?;
        }
    }

    Ok(())
}
