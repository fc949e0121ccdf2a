use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use log::{debug, info, warn};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use super::snapshot_model::{AccountValuation, CaptureOutcome, SnapshotPoint};
use super::snapshot_traits::{SnapshotCaptureServiceTrait, SnapshotRepositoryTrait};
use crate::constants::{ACCOUNT_BATCH_SIZE, SNAPSHOT_DECIMAL_PRECISION};
use crate::errors::{DatabaseError, Error, Result};
use crate::events::{DomainEvent, DomainEventSink, NoOpDomainEventSink};
use crate::legacy::LegacyBalanceReaderTrait;
use crate::portfolio::holdings::{holdings_value, HoldingsReaderTrait};
use crate::utils::time_utils::truncate_to_minute;

/// Minimum interval between opportunistic captures of one account.
pub const DEFAULT_CAPTURE_THROTTLE: Duration = Duration::from_secs(30);

/// Samples available balance plus holdings value into minute buckets.
///
/// Reads run without the ledger's account lock; a stale sample is corrected
/// by the next capture of the same account.
pub struct SnapshotCaptureService {
    snapshot_repository: Arc<dyn SnapshotRepositoryTrait>,
    holdings_reader: Arc<dyn HoldingsReaderTrait>,
    legacy_reader: Arc<dyn LegacyBalanceReaderTrait>,
    event_sink: Arc<dyn DomainEventSink>,
    batch_size: usize,
    throttle: Duration,
    last_attempts: DashMap<String, Instant>,
}

impl SnapshotCaptureService {
    pub fn new(
        snapshot_repository: Arc<dyn SnapshotRepositoryTrait>,
        holdings_reader: Arc<dyn HoldingsReaderTrait>,
        legacy_reader: Arc<dyn LegacyBalanceReaderTrait>,
    ) -> Self {
        Self {
            snapshot_repository,
            holdings_reader,
            legacy_reader,
            event_sink: Arc::new(NoOpDomainEventSink),
            batch_size: ACCOUNT_BATCH_SIZE,
            throttle: DEFAULT_CAPTURE_THROTTLE,
            last_attempts: DashMap::new(),
        }
    }

    /// Sets the domain event sink for emitting SnapshotUpdated events.
    pub fn with_event_sink(mut self, event_sink: Arc<dyn DomainEventSink>) -> Self {
        self.event_sink = event_sink;
        self
    }

    pub fn with_throttle(mut self, throttle: Duration) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Current available balance and holdings value of an account.
    pub fn valuate(&self, account_id: &str) -> Result<AccountValuation> {
        let legacy = self.legacy_reader.get_legacy_balances(account_id)?;
        let positions = self.holdings_reader.get_positions(account_id)?;
        Ok(AccountValuation {
            available_balance: legacy.available_balance(),
            holdings_value: holdings_value(&positions)?,
        })
    }

    async fn upsert(
        &self,
        account_id: &str,
        bucket_at: DateTime<Utc>,
        value: Decimal,
        available_balance: Decimal,
    ) -> Result<CaptureOutcome> {
        if let Some(existing) = self.snapshot_repository.get_point(account_id, bucket_at)? {
            return self.update_if_changed(&existing, value, available_balance).await;
        }

        let point = SnapshotPoint::new(account_id, bucket_at, value, available_balance, Utc::now());
        match self.snapshot_repository.insert_point(point).await {
            Ok(_) => Ok(CaptureOutcome::Created),
            Err(Error::Database(DatabaseError::UniqueViolation(_))) => {
                debug!(
                    "Snapshot bucket {} for account {} was filled concurrently, re-reading",
                    bucket_at, account_id
                );
                let winner = self
                    .snapshot_repository
                    .get_point(account_id, bucket_at)?
                    .ok_or_else(|| {
                        Error::Unexpected(format!(
                            "Snapshot bucket {} for account {} vanished after a unique conflict",
                            bucket_at, account_id
                        ))
                    })?;
                self.update_if_changed(&winner, value, available_balance)
                    .await
            }
            Err(e) => Err(e),
        }
    }

    async fn update_if_changed(
        &self,
        existing: &SnapshotPoint,
        value: Decimal,
        available_balance: Decimal,
    ) -> Result<CaptureOutcome> {
        if !existing.differs_from(value, available_balance) {
            return Ok(CaptureOutcome::Unchanged);
        }
        self.snapshot_repository
            .update_point_values(&existing.id, value, available_balance, Utc::now())
            .await?;
        Ok(CaptureOutcome::Updated)
    }

    /// Forgets accounts whose throttle window has passed.
    fn prune_throttle(&self) {
        let now = Instant::now();
        self.last_attempts
            .retain(|_, attempted| now.duration_since(*attempted) < self.throttle);
    }

    pub(crate) fn throttled_account_count(&self) -> usize {
        self.last_attempts.len()
    }

    /// Records an opportunistic attempt; true when the account is throttled.
    fn is_throttled(&self, account_id: &str) -> bool {
        let now = Instant::now();
        match self.last_attempts.entry(account_id.to_string()) {
            Entry::Occupied(mut entry) => {
                if now.duration_since(*entry.get()) < self.throttle {
                    true
                } else {
                    entry.insert(now);
                    false
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(now);
                false
            }
        }
    }
}

#[async_trait]
impl SnapshotCaptureServiceTrait for SnapshotCaptureService {
    async fn capture_for_account(
        &self,
        account_id: &str,
        at: Option<DateTime<Utc>>,
    ) -> Result<bool> {
        let valuation = self.valuate(account_id)?;
        let bucket_at = truncate_to_minute(at.unwrap_or_else(Utc::now));
        let value = valuation
            .total_value()?
            .round_dp(SNAPSHOT_DECIMAL_PRECISION);
        let available_balance = valuation
            .available_balance
            .round_dp(SNAPSHOT_DECIMAL_PRECISION);

        let outcome = self
            .upsert(account_id, bucket_at, value, available_balance)
            .await?;

        if outcome.changed() {
            debug!(
                "Snapshot {:?} for account {} at {}: value {}, available {}",
                outcome, account_id, bucket_at, value, available_balance
            );
            self.event_sink.emit(DomainEvent::snapshot_updated(
                account_id.to_string(),
                value,
                available_balance,
                bucket_at,
            ));
        }
        Ok(outcome.changed())
    }

    async fn capture_for_all_active_accounts(&self, at: Option<DateTime<Utc>>) -> Result<usize> {
        self.prune_throttle();
        let at = at.unwrap_or_else(Utc::now);
        let mut after: Option<String> = None;
        let mut visited = 0usize;
        let mut changed = 0usize;
        let mut skipped = 0usize;

        loop {
            let batch = self
                .holdings_reader
                .list_active_accounts(after.as_deref(), self.batch_size)?;
            if batch.is_empty() {
                break;
            }

            for account_id in &batch {
                visited += 1;
                match self.capture_for_account(account_id, Some(at)).await {
                    Ok(true) => changed += 1,
                    Ok(false) => {}
                    Err(e) => {
                        skipped += 1;
                        warn!("Skipping snapshot capture for account {}: {}", account_id, e);
                    }
                }
            }

            let exhausted = batch.len() < self.batch_size;
            after = batch.last().cloned();
            if exhausted {
                break;
            }
        }

        info!(
            "Snapshot sweep at {}: {} accounts visited, {} changed, {} skipped",
            truncate_to_minute(at),
            visited,
            changed,
            skipped
        );
        Ok(changed)
    }

    async fn capture_if_stale(&self, account_id: &str) -> Result<bool> {
        if self.is_throttled(account_id) {
            return Ok(false);
        }
        self.capture_for_account(account_id, None).await
    }

    fn get_history(
        &self,
        account_id: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<SnapshotPoint>> {
        self.snapshot_repository.get_points(account_id, from, to)
    }
}
