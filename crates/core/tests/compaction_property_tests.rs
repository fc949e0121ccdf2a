//! Property-based integration tests for snapshot compaction planning.

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use std::collections::{HashMap, HashSet};
use tradeledger_core::portfolio::compaction::{bucket_index, plan_tier_deletions};
use tradeledger_core::portfolio::snapshot::SnapshotRef;

// =============================================================================
// Generators
// =============================================================================

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

/// Distinct minute offsets within roughly two weeks.
fn arb_refs() -> impl Strategy<Value = Vec<SnapshotRef>> {
    prop::collection::hash_set(0i64..20_000, 0..300).prop_map(|minutes| {
        minutes
            .into_iter()
            .map(|m| SnapshotRef {
                id: format!("s{}", m),
                bucket_at: base() + Duration::minutes(m),
            })
            .collect()
    })
}

fn arb_bucket_minutes() -> impl Strategy<Value = i64> {
    prop_oneof![Just(1i64), Just(5), Just(60), Just(1440), 1i64..600]
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Survivors are exactly the newest point of every occupied bucket.
    #[test]
    fn prop_keep_latest_per_bucket(refs in arb_refs(), bucket_minutes in arb_bucket_minutes()) {
        let bucket_seconds = bucket_minutes * 60;
        let deleted: HashSet<String> = plan_tier_deletions(&refs, bucket_seconds).into_iter().collect();

        let mut newest: HashMap<i64, &SnapshotRef> = HashMap::new();
        for r in &refs {
            let bucket = bucket_index(r.bucket_at, bucket_seconds);
            let entry = newest.entry(bucket).or_insert(r);
            if r.bucket_at > entry.bucket_at {
                *entry = r;
            }
        }

        let survivors: HashSet<String> = refs
            .iter()
            .filter(|r| !deleted.contains(&r.id))
            .map(|r| r.id.clone())
            .collect();
        let expected: HashSet<String> = newest.values().map(|r| r.id.clone()).collect();
        prop_assert_eq!(survivors, expected);
        prop_assert_eq!(deleted.len() + newest.len(), refs.len());
    }

    /// Planning again over the survivors deletes nothing.
    #[test]
    fn prop_compaction_is_idempotent(refs in arb_refs(), bucket_minutes in arb_bucket_minutes()) {
        let bucket_seconds = bucket_minutes * 60;
        let deleted: HashSet<String> = plan_tier_deletions(&refs, bucket_seconds).into_iter().collect();
        let survivors: Vec<SnapshotRef> = refs
            .into_iter()
            .filter(|r| !deleted.contains(&r.id))
            .collect();
        prop_assert!(plan_tier_deletions(&survivors, bucket_seconds).is_empty());
    }

    /// The newest point of the scan is never planned for deletion.
    #[test]
    fn prop_newest_point_survives(refs in arb_refs(), bucket_minutes in arb_bucket_minutes()) {
        if let Some(newest) = refs.iter().max_by_key(|r| r.bucket_at) {
            let deleted = plan_tier_deletions(&refs, bucket_minutes * 60);
            prop_assert!(!deleted.contains(&newest.id));
        }
    }
}
