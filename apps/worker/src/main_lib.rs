use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};
use tradeledger_core::ledger::LedgerService;
use tradeledger_core::portfolio::compaction::SnapshotCompactionService;
use tradeledger_core::portfolio::snapshot::SnapshotCaptureService;
use tradeledger_storage_sqlite::{
    db, HoldingsRepository, LedgerRepository, LegacyBalanceRepository, SnapshotRepository,
};

use crate::config::Config;
use crate::domain_events::{
    event_queue_worker, handle_event, QueueWorkerDeps, WorkerDomainEventSink,
};

pub struct AppState {
    pub ledger_service: Arc<LedgerService>,
    pub capture_service: Arc<SnapshotCaptureService>,
    pub compaction_service: Arc<SnapshotCompactionService>,
    pub holdings_repository: Arc<HoldingsRepository>,
    pub db_path: String,
    domain_event_sink: Arc<WorkerDomainEventSink>,
    queue_worker_deps: Arc<QueueWorkerDeps>,
    queue_worker: Mutex<Option<JoinHandle<()>>>,
}

impl AppState {
    /// Stops the domain event queue worker after it has handled every
    /// queued event, including events emitted while draining.
    pub async fn shutdown(&self) {
        self.domain_event_sink.detach();

        let handle = match self.queue_worker.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::warn!("Domain event queue worker ended abnormally: {}", e);
            }
        }

        loop {
            let pending = self.domain_event_sink.take_buffered();
            if pending.is_empty() {
                break;
            }
            for event in &pending {
                handle_event(event, &self.queue_worker_deps).await;
            }
        }
    }
}

pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

pub async fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let db_path = db::init(&config.db_path)?;
    tracing::info!("Database path in use: {}", db_path);

    let pool = db::create_pool(&db_path)?;
    db::run_migrations(&pool)?;
    let writer = db::spawn_writer((*pool).clone());

    // Two-phase initialization: the sink buffers until the queue worker starts.
    let domain_event_sink = Arc::new(WorkerDomainEventSink::new());

    let ledger_repository = Arc::new(LedgerRepository::new(pool.clone(), writer.clone()));
    let legacy_repository = Arc::new(LegacyBalanceRepository::new(pool.clone()));
    let holdings_repository = Arc::new(HoldingsRepository::new(pool.clone(), writer.clone()));
    let snapshot_repository = Arc::new(SnapshotRepository::new(pool.clone(), writer.clone()));

    let ledger_service = Arc::new(
        LedgerService::new(ledger_repository, legacy_repository.clone())
            .with_lock_timeout(config.ledger_lock_timeout)
            .with_event_sink(domain_event_sink.clone()),
    );

    let capture_service = Arc::new(
        SnapshotCaptureService::new(
            snapshot_repository.clone(),
            holdings_repository.clone(),
            legacy_repository,
        )
        .with_throttle(config.capture_throttle)
        .with_event_sink(domain_event_sink.clone()),
    );

    let compaction_service = Arc::new(SnapshotCompactionService::new(
        snapshot_repository,
        config.compaction_policy,
    ));

    let queue_worker_deps = Arc::new(QueueWorkerDeps {
        capture_service: capture_service.clone(),
    });
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    domain_event_sink.attach(event_tx);
    let queue_worker = tokio::spawn(event_queue_worker(event_rx, queue_worker_deps.clone()));

    Ok(Arc::new(AppState {
        ledger_service,
        capture_service,
        compaction_service,
        holdings_repository,
        db_path,
        domain_event_sink,
        queue_worker_deps,
        queue_worker: Mutex::new(Some(queue_worker)),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tempfile::tempdir;
    use tradeledger_core::ledger::{LedgerServiceTrait, PostingAttributes, EVENT_TYPE_DEPOSIT};
    use tradeledger_core::portfolio::snapshot::SnapshotCaptureServiceTrait;

    #[tokio::test]
    async fn test_shutdown_waits_for_follow_up_capture() {
        let temp_dir = tempdir().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("worker.db").to_string_lossy().to_string();
        let config = Config::from_lookup(|key| (key == "TL_DB_PATH").then(|| db_path.clone()))
            .expect("Failed to build config");
        let state = build_state(&config).await.expect("Failed to build state");

        let attributes = PostingAttributes {
            cash_delta: Some(dec!(100)),
            ..Default::default()
        };
        state
            .ledger_service
            .post("acc-1", EVENT_TYPE_DEPOSIT, attributes)
            .await
            .unwrap();

        state.shutdown().await;

        let history = state
            .capture_service
            .get_history("acc-1", None, None)
            .unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].value, dec!(100));
    }
}

