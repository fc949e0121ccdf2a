//! Event queue worker for processing domain events.

use std::sync::Arc;

use tokio::sync::mpsc;
use tradeledger_core::events::DomainEvent;
use tradeledger_core::portfolio::snapshot::SnapshotCaptureServiceTrait;

/// Dependencies needed by the queue worker for processing events.
pub struct QueueWorkerDeps {
    pub capture_service: Arc<dyn SnapshotCaptureServiceTrait>,
}

/// Runs until every sender is dropped.
pub async fn event_queue_worker(
    mut rx: mpsc::UnboundedReceiver<DomainEvent>,
    deps: Arc<QueueWorkerDeps>,
) {
    tracing::info!("Domain event queue worker started");

    while let Some(event) = rx.recv().await {
        handle_event(&event, &deps).await;
    }

    tracing::info!("Domain event queue worker stopped");
}

/// `SnapshotUpdated` events are published as structured notifications;
/// `LedgerPosted` triggers a throttled capture of the posting account.
pub async fn handle_event(event: &DomainEvent, deps: &QueueWorkerDeps) {
    match event {
        DomainEvent::SnapshotUpdated { .. } => publish(event),
        DomainEvent::LedgerPosted {
            account_id,
            event_type,
            ..
        } => {
            tracing::debug!("Ledger event '{}' posted for {}", event_type, account_id);
            if let Err(e) = deps.capture_service.capture_if_stale(account_id).await {
                tracing::warn!("Follow-up capture for account {} failed: {}", account_id, e);
            }
        }
    }
}

fn publish(event: &DomainEvent) {
    match serde_json::to_string(event) {
        Ok(payload) => tracing::info!(target: "tradeledger::notifications", "{}", payload),
        Err(e) => tracing::warn!("Could not serialize notification: {}", e),
    }
}
