//! Portfolio module - holdings valuation, minute snapshots and their compaction.

pub mod compaction;
pub mod holdings;
pub mod snapshot;

pub use compaction::*;
pub use holdings::*;
pub use snapshot::*;
