//! Snapshot domain models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::SNAPSHOT_EPSILON;
use crate::errors::{Result, ValidationError};

/// Account value sampled at the start of a calendar minute.
///
/// At most one point exists per `(account_id, bucket_at)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotPoint {
    pub id: String,
    pub account_id: String,
    /// Minute-truncated sample time
    pub bucket_at: DateTime<Utc>,
    /// Available balance plus holdings value
    pub value: Decimal,
    pub available_balance: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SnapshotPoint {
    /// Deterministic id of the point for an account and minute.
    pub fn point_id(account_id: &str, bucket_at: DateTime<Utc>) -> String {
        format!("{}_{}", account_id, bucket_at.timestamp())
    }

    pub fn new(
        account_id: &str,
        bucket_at: DateTime<Utc>,
        value: Decimal,
        available_balance: Decimal,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Self::point_id(account_id, bucket_at),
            account_id: account_id.to_string(),
            bucket_at,
            value,
            available_balance,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether freshly computed figures differ enough to rewrite this point.
    pub fn differs_from(&self, value: Decimal, available_balance: Decimal) -> bool {
        self.value.saturating_sub(value).abs() >= SNAPSHOT_EPSILON
            || self.available_balance.saturating_sub(available_balance).abs() >= SNAPSHOT_EPSILON
    }
}

/// Id and time of a stored point, as scanned by compaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRef {
    pub id: String,
    pub bucket_at: DateTime<Utc>,
}

/// The figures a capture is computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountValuation {
    pub available_balance: Decimal,
    pub holdings_value: Decimal,
}

impl AccountValuation {
    pub fn total_value(&self) -> Result<Decimal> {
        self.available_balance
            .checked_add(self.holdings_value)
            .ok_or_else(|| {
                ValidationError::InvalidInput(format!(
                    "Snapshot value overflow: available {} plus holdings {}",
                    self.available_balance, self.holdings_value
                ))
                .into()
            })
    }
}

/// What a capture did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    Created,
    Updated,
    Unchanged,
}

impl CaptureOutcome {
    pub fn changed(self) -> bool {
        !matches!(self, CaptureOutcome::Unchanged)
    }
}
