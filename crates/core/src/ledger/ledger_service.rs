use async_trait::async_trait;
use chrono::Utc;
use log::{debug, error, info};
use std::sync::Arc;
use std::time::Duration;

use super::account_locks::AccountLocks;
use super::ledger_calculator::{plan_posting, verify_ledger};
use super::ledger_model::{AccountProjection, LedgerEvent, LedgerVerification, PostingAttributes};
use super::ledger_traits::{LedgerRepositoryTrait, LedgerServiceTrait, PostingPlanner};
use crate::errors::{Error, LedgerError, Result, ValidationError};
use crate::events::{DomainEvent, DomainEventSink, NoOpDomainEventSink};
use crate::legacy::LegacyBalanceReaderTrait;

/// Sole writer of account projections and ledger events.
///
/// Postings for one account are serialized through [`AccountLocks`]; the
/// repository makes each posting a single atomic storage unit.
pub struct LedgerService {
    repository: Arc<dyn LedgerRepositoryTrait>,
    legacy_reader: Arc<dyn LegacyBalanceReaderTrait>,
    locks: AccountLocks,
    event_sink: Arc<dyn DomainEventSink>,
}

impl LedgerService {
    pub fn new(
        repository: Arc<dyn LedgerRepositoryTrait>,
        legacy_reader: Arc<dyn LegacyBalanceReaderTrait>,
    ) -> Self {
        Self {
            repository,
            legacy_reader,
            locks: AccountLocks::default(),
            event_sink: Arc::new(NoOpDomainEventSink),
        }
    }

    /// Sets how long a posting waits for a busy account before failing.
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.locks = AccountLocks::new(timeout);
        self
    }

    /// Sets the domain event sink for emitting LedgerPosted events.
    pub fn with_event_sink(mut self, event_sink: Arc<dyn DomainEventSink>) -> Self {
        self.event_sink = event_sink;
        self
    }

    fn seed_projection(&self, account_id: &str) -> Result<AccountProjection> {
        let record = self.legacy_reader.get_legacy_balances(account_id)?;
        let seed = record.seed_balances();
        info!(
            "Seeding ledger projection for account {} from legacy balances (cash {}, holdings {}, profit {})",
            account_id, seed.cash, seed.holdings, seed.profit
        );
        Ok(AccountProjection::seeded(account_id, seed, Utc::now()))
    }
}

fn require_account_id(account_id: &str) -> Result<()> {
    if account_id.trim().is_empty() {
        return Err(Error::Validation(ValidationError::MissingField(
            "account_id".to_string(),
        )));
    }
    Ok(())
}

#[async_trait]
impl LedgerServiceTrait for LedgerService {
    async fn ensure_account(&self, account_id: &str) -> Result<AccountProjection> {
        require_account_id(account_id)?;
        let _guard = self.locks.acquire(account_id).await?;

        if let Some(existing) = self.repository.get_projection(account_id)? {
            return Ok(existing);
        }
        let seed = self.seed_projection(account_id)?;
        self.repository.create_projection_if_absent(seed).await
    }

    async fn post(
        &self,
        account_id: &str,
        event_type: &str,
        attributes: PostingAttributes,
    ) -> Result<LedgerEvent> {
        require_account_id(account_id)?;
        if event_type.trim().is_empty() {
            return Err(
                LedgerError::InvalidAttributes("event type cannot be empty".to_string()).into(),
            );
        }

        let _guard = self.locks.acquire(account_id).await?;

        let seed = match self.repository.get_projection(account_id)? {
            Some(_) => None,
            None => Some(self.seed_projection(account_id)?),
        };

        let mirror_legacy = !attributes.suppress_mirror;
        let event_type_owned = event_type.to_string();
        let now = Utc::now();
        let planner: PostingPlanner = Box::new(move |current, next_sequence| {
            plan_posting(current, next_sequence, &event_type_owned, &attributes, now)
        });

        let posted = self
            .repository
            .apply_posting(account_id, seed, planner, mirror_legacy)
            .await
            .map_err(|e| {
                error!(
                    "Ledger posting '{}' for account {} failed: {}",
                    event_type, account_id, e
                );
                e
            })?;

        debug!(
            "Posted ledger event {} (#{}, {}) for account {}: cash {} holdings {} profit {}",
            posted.event.id,
            posted.event.sequence,
            posted.event.event_type,
            account_id,
            posted.projection.balances.cash,
            posted.projection.balances.holdings,
            posted.projection.balances.profit
        );

        self.event_sink.emit(DomainEvent::ledger_posted(
            account_id.to_string(),
            posted.event.id.clone(),
            posted.event.event_type.clone(),
        ));

        Ok(posted.event)
    }

    fn get_projection(&self, account_id: &str) -> Result<Option<AccountProjection>> {
        self.repository.get_projection(account_id)
    }

    fn list_events(&self, account_id: &str) -> Result<Vec<LedgerEvent>> {
        self.repository.list_events(account_id)
    }

    fn verify_account(&self, account_id: &str) -> Result<LedgerVerification> {
        let projection = self
            .repository
            .get_projection(account_id)?
            .ok_or_else(|| LedgerError::ProjectionNotFound(account_id.to_string()))?;
        let events = self.repository.list_events(account_id)?;
        Ok(verify_ledger(account_id, &projection, &events))
    }
}
