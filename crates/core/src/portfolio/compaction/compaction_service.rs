use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::compaction_model::{CompactionPolicy, CompactionSummary, CompactionTier, TierKind};
use super::compaction_planner::{plan_tier_deletions, validate_delete_set};
use crate::constants::{ACCOUNT_BATCH_SIZE, COMPACTION_DELETE_BATCH_SIZE};
use crate::errors::Result;
use crate::portfolio::snapshot::SnapshotRepositoryTrait;

/// Periodic thinning of the snapshot store.
#[async_trait]
pub trait SnapshotCompactionServiceTrait: Send + Sync {
    /// Compacts one account, or every account with snapshots when
    /// `account_filter` is `None`. A dry run only counts.
    async fn run_compaction(
        &self,
        account_filter: Option<&str>,
        dry_run: bool,
    ) -> Result<CompactionSummary>;
}

pub struct SnapshotCompactionService {
    repository: Arc<dyn SnapshotRepositoryTrait>,
    policy: CompactionPolicy,
    batch_size: usize,
}

impl SnapshotCompactionService {
    pub fn new(repository: Arc<dyn SnapshotRepositoryTrait>, policy: CompactionPolicy) -> Self {
        Self {
            repository,
            policy: policy.normalized(),
            batch_size: ACCOUNT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn policy(&self) -> &CompactionPolicy {
        &self.policy
    }

    /// Runs compaction with tier boundaries fixed at `now`.
    ///
    /// Points inserted after the scan of a tier lie past its range end and
    /// are never considered.
    pub async fn run_compaction_at(
        &self,
        account_filter: Option<&str>,
        dry_run: bool,
        now: DateTime<Utc>,
    ) -> Result<CompactionSummary> {
        let tiers = self.policy.tiers(now);
        let mut summary = CompactionSummary {
            dry_run,
            ..Default::default()
        };

        if let Some(account_id) = account_filter {
            self.compact_and_record(account_id, &tiers, &mut summary).await;
        } else {
            let mut after: Option<String> = None;
            loop {
                let batch = self
                    .repository
                    .list_accounts_with_snapshots(after.as_deref(), self.batch_size)?;
                if batch.is_empty() {
                    break;
                }
                for account_id in &batch {
                    self.compact_and_record(account_id, &tiers, &mut summary)
                        .await;
                }
                let exhausted = batch.len() < self.batch_size;
                after = batch.last().cloned();
                if exhausted {
                    break;
                }
            }
        }

        info!(
            "Snapshot compaction{}: {} accounts, {} snapshots {}, {} failed",
            if dry_run { " (dry run)" } else { "" },
            summary.processed,
            summary.deleted,
            if dry_run { "to delete" } else { "deleted" },
            summary.failed
        );
        Ok(summary)
    }

    async fn compact_and_record(
        &self,
        account_id: &str,
        tiers: &[CompactionTier],
        summary: &mut CompactionSummary,
    ) {
        summary.processed += 1;
        match self.compact_account(account_id, tiers, summary.dry_run).await {
            Ok(by_tier) => {
                for (kind, count) in by_tier {
                    summary.record_tier(kind, count);
                }
            }
            Err(e) => {
                summary.failed += 1;
                warn!("Snapshot compaction for account {} failed: {}", account_id, e);
            }
        }
    }

    /// Plans and validates every tier before deleting anything.
    async fn compact_account(
        &self,
        account_id: &str,
        tiers: &[CompactionTier],
        dry_run: bool,
    ) -> Result<BTreeMap<TierKind, usize>> {
        let newest = self.repository.get_latest_ref(account_id)?;

        let mut plans = Vec::with_capacity(tiers.len());
        for tier in tiers {
            let scanned =
                self.repository
                    .list_refs_in_range(account_id, tier.range_start, tier.range_end)?;
            let delete_ids = plan_tier_deletions(&scanned, tier.bucket_seconds());
            validate_delete_set(account_id, &scanned, &delete_ids, newest.as_ref())?;
            plans.push((tier.kind, delete_ids));
        }

        let mut by_tier = BTreeMap::new();
        for (kind, delete_ids) in plans {
            let count = if dry_run {
                delete_ids.len()
            } else {
                let mut removed = 0;
                for chunk in delete_ids.chunks(COMPACTION_DELETE_BATCH_SIZE) {
                    removed += self.repository.delete_points(chunk).await?;
                }
                removed
            };
            if count > 0 {
                debug!(
                    "Compaction {} tier for account {}: {} snapshots",
                    kind, account_id, count
                );
            }
            by_tier.insert(kind, count);
        }
        Ok(by_tier)
    }
}

#[async_trait]
impl SnapshotCompactionServiceTrait for SnapshotCompactionService {
    async fn run_compaction(
        &self,
        account_filter: Option<&str>,
        dry_run: bool,
    ) -> Result<CompactionSummary> {
        self.run_compaction_at(account_filter, dry_run, Utc::now())
            .await
    }
}
