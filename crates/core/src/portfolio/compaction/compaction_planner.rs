//! Pure keep-latest planning for one tier.

use chrono::{DateTime, Utc};
use std::collections::HashSet;

use crate::errors::{CompactionError, Result};
use crate::portfolio::snapshot::SnapshotRef;

/// `floor(timestamp_seconds / bucket_seconds)`, also for pre-epoch times.
pub fn bucket_index(timestamp: DateTime<Utc>, bucket_seconds: i64) -> i64 {
    timestamp.timestamp().div_euclid(bucket_seconds.max(1))
}

/// Ids to delete so that each bucket keeps only its newest point.
///
/// The newest point of a bucket survives, never the oldest and never an
/// average. Ties on time are broken by id so the plan is deterministic.
pub fn plan_tier_deletions(refs: &[SnapshotRef], bucket_seconds: i64) -> Vec<String> {
    let mut ordered: Vec<&SnapshotRef> = refs.iter().collect();
    ordered.sort_by(|a, b| b.bucket_at.cmp(&a.bucket_at).then_with(|| b.id.cmp(&a.id)));

    let mut seen = HashSet::new();
    ordered
        .into_iter()
        .filter(|r| !seen.insert(bucket_index(r.bucket_at, bucket_seconds)))
        .map(|r| r.id.clone())
        .collect()
}

/// Refuses a delete set that names a point outside the scan or the
/// account's newest point.
pub fn validate_delete_set(
    account_id: &str,
    scanned: &[SnapshotRef],
    delete_ids: &[String],
    newest: Option<&SnapshotRef>,
) -> Result<()> {
    let scanned_ids: HashSet<&str> = scanned.iter().map(|r| r.id.as_str()).collect();
    let unsafe_set = |reason: String| CompactionError::UnsafeDeleteSet {
        account_id: account_id.to_string(),
        reason,
    };

    if let Some(stray) = delete_ids.iter().find(|id| !scanned_ids.contains(id.as_str())) {
        return Err(unsafe_set(format!("{} was not part of the scanned range", stray)).into());
    }
    if let Some(newest) = newest {
        if delete_ids.iter().any(|id| *id == newest.id) {
            return Err(unsafe_set(format!("{} is the newest snapshot", newest.id)).into());
        }
    }
    Ok(())
}
