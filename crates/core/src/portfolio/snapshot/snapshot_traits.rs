//! Repository and service traits for minute snapshots.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::snapshot_model::{SnapshotPoint, SnapshotRef};
use crate::errors::Result;

/// Repository trait for the snapshot store.
#[async_trait]
pub trait SnapshotRepositoryTrait: Send + Sync {
    /// The point of an account for an exact minute bucket.
    fn get_point(&self, account_id: &str, bucket_at: DateTime<Utc>)
        -> Result<Option<SnapshotPoint>>;

    /// Inserts a new point. Fails with `DatabaseError::UniqueViolation` when
    /// the `(account, minute)` bucket is already taken.
    async fn insert_point(&self, point: SnapshotPoint) -> Result<SnapshotPoint>;

    /// Overwrites value and available balance of an existing point.
    async fn update_point_values(
        &self,
        id: &str,
        value: Decimal,
        available_balance: Decimal,
        updated_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Points of an account with `from <= bucket_at <= to`, ascending.
    fn get_points(
        &self,
        account_id: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<SnapshotPoint>>;

    /// Refs in `[start, end)` (unbounded below when `start` is `None`),
    /// newest first.
    fn list_refs_in_range(
        &self,
        account_id: &str,
        start: Option<DateTime<Utc>>,
        end: DateTime<Utc>,
    ) -> Result<Vec<SnapshotRef>>;

    /// The newest point of an account, if any.
    fn get_latest_ref(&self, account_id: &str) -> Result<Option<SnapshotRef>>;

    /// Accounts that have at least one point, ordered by id, strictly after
    /// `after`, at most `limit` of them.
    fn list_accounts_with_snapshots(&self, after: Option<&str>, limit: usize)
        -> Result<Vec<String>>;

    /// Deletes points by id and returns how many rows were removed.
    async fn delete_points(&self, ids: &[String]) -> Result<usize>;
}

/// Samples account value into the snapshot store.
#[async_trait]
pub trait SnapshotCaptureServiceTrait: Send + Sync {
    /// Upserts the snapshot for the minute containing `at` (default now).
    ///
    /// Returns true when a point was created or materially updated.
    async fn capture_for_account(&self, account_id: &str, at: Option<DateTime<Utc>>)
        -> Result<bool>;

    /// Captures every account with a wallet or a position, in fixed-size
    /// batches. Returns the number of accounts whose point changed.
    async fn capture_for_all_active_accounts(&self, at: Option<DateTime<Utc>>) -> Result<usize>;

    /// Captures now unless this account was captured through this path
    /// within the throttle window.
    async fn capture_if_stale(&self, account_id: &str) -> Result<bool>;

    /// Stored points of an account, ascending by time.
    fn get_history(
        &self,
        account_id: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<SnapshotPoint>>;
}
