//! Snapshot compaction - tiered keep-latest thinning of old snapshots.

mod compaction_model;
pub mod compaction_planner;
mod compaction_service;

pub use compaction_model::*;
pub use compaction_planner::{bucket_index, plan_tier_deletions, validate_delete_set};
pub use compaction_service::{SnapshotCompactionService, SnapshotCompactionServiceTrait};
