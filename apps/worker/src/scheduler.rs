//! Background schedulers for periodic capture and compaction.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{info, warn};
use tradeledger_core::portfolio::compaction::SnapshotCompactionServiceTrait;
use tradeledger_core::portfolio::snapshot::SnapshotCaptureServiceTrait;

use crate::main_lib::AppState;

/// Starts the capture sweep. The first tick fires immediately.
pub fn start_capture_scheduler(state: Arc<AppState>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Snapshot capture scheduler started ({}s interval)", period.as_secs());
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            if let Err(e) = state
                .capture_service
                .capture_for_all_active_accounts(None)
                .await
            {
                warn!("Scheduled snapshot capture failed: {}", e);
            }
        }
    })
}

/// Starts the compaction job. The first run waits one full period.
pub fn start_compaction_scheduler(state: Arc<AppState>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Snapshot compaction scheduler started ({}s interval)", period.as_secs());
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match state.compaction_service.run_compaction(None, false).await {
                Ok(summary) => info!(
                    "Scheduled compaction removed {} snapshots across {} accounts",
                    summary.deleted, summary.processed
                ),
                Err(e) => warn!("Scheduled snapshot compaction failed: {}", e),
            }
        }
    })
}
