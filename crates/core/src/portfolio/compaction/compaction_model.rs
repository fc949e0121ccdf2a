//! Compaction policy and run summary models.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Age windows and bucket widths of the retention tiers.
///
/// Snapshots younger than `fine_days` are never touched. Older ones keep one
/// point per bucket of the tier they fall in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompactionPolicy {
    pub fine_days: i64,
    pub mid_days: i64,
    pub coarse_days: i64,
    pub mid_bucket_minutes: i64,
    pub coarse_bucket_minutes: i64,
    pub archive_bucket_minutes: i64,
}

impl Default for CompactionPolicy {
    fn default() -> Self {
        Self {
            fine_days: 7,
            mid_days: 30,
            coarse_days: 365,
            mid_bucket_minutes: 5,
            coarse_bucket_minutes: 60,
            archive_bucket_minutes: 1440,
        }
    }
}

impl CompactionPolicy {
    /// Clamps the boundaries so `0 <= fine < mid < coarse` and every bucket
    /// is at least one minute wide.
    pub fn normalized(&self) -> Self {
        let fine_days = self.fine_days.max(0);
        let mid_days = self.mid_days.max(fine_days.saturating_add(1));
        let coarse_days = self.coarse_days.max(mid_days.saturating_add(1));
        Self {
            fine_days,
            mid_days,
            coarse_days,
            mid_bucket_minutes: self.mid_bucket_minutes.max(1),
            coarse_bucket_minutes: self.coarse_bucket_minutes.max(1),
            archive_bucket_minutes: self.archive_bucket_minutes.max(1),
        }
    }

    /// The compactable tiers as seen from `now`, newest first.
    pub fn tiers(&self, now: DateTime<Utc>) -> Vec<CompactionTier> {
        let policy = self.normalized();
        let fine_cutoff = days_before(now, policy.fine_days);
        let mid_cutoff = days_before(now, policy.mid_days);
        let coarse_cutoff = days_before(now, policy.coarse_days);

        vec![
            CompactionTier {
                kind: TierKind::Mid,
                range_start: Some(mid_cutoff),
                range_end: fine_cutoff,
                bucket_minutes: policy.mid_bucket_minutes,
            },
            CompactionTier {
                kind: TierKind::Coarse,
                range_start: Some(coarse_cutoff),
                range_end: mid_cutoff,
                bucket_minutes: policy.coarse_bucket_minutes,
            },
            CompactionTier {
                kind: TierKind::Archive,
                range_start: None,
                range_end: coarse_cutoff,
                bucket_minutes: policy.archive_bucket_minutes,
            },
        ]
    }
}

/// `now - days`, clamped to the earliest representable instant.
fn days_before(now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    TimeDelta::try_days(days)
        .and_then(|delta| now.checked_sub_signed(delta))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierKind {
    Mid,
    Coarse,
    Archive,
}

impl fmt::Display for TierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TierKind::Mid => "mid",
            TierKind::Coarse => "coarse",
            TierKind::Archive => "archive",
        };
        f.write_str(name)
    }
}

/// One age window with its bucket width. The range is `[range_start, range_end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactionTier {
    pub kind: TierKind,
    pub range_start: Option<DateTime<Utc>>,
    pub range_end: DateTime<Utc>,
    pub bucket_minutes: i64,
}

impl CompactionTier {
    pub fn bucket_seconds(&self) -> i64 {
        self.bucket_minutes.max(1).saturating_mul(60)
    }
}

/// Outcome of one compaction run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompactionSummary {
    /// Accounts examined
    pub processed: usize,
    /// Points deleted, or that would be deleted in a dry run
    pub deleted: usize,
    pub dry_run: bool,
    /// Accounts skipped because of an error
    pub failed: usize,
    pub by_tier: BTreeMap<TierKind, usize>,
}

impl CompactionSummary {
    pub(crate) fn record_tier(&mut self, kind: TierKind, count: usize) {
        *self.by_tier.entry(kind).or_insert(0) += count;
        self.deleted += count;
    }
}
