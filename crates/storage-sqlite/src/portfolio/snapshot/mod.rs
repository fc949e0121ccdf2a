//! SQLite storage implementation for portfolio value snapshots.

mod model;
mod repository;

pub use model::SnapshotPointDB;
pub use repository::SnapshotRepository;

// Re-export trait from core for convenience
pub use tradeledger_core::portfolio::snapshot::SnapshotRepositoryTrait;
