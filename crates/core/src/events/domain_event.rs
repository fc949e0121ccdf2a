//! Domain event types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Domain events emitted by core services after successful mutations.
///
/// Runtime adapters translate them into platform-specific actions (live
/// dashboard pushes, cache invalidation, follow-up captures).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    /// A snapshot bucket was created or materially updated.
    #[serde(rename_all = "camelCase")]
    SnapshotUpdated {
        account_id: String,
        value: Decimal,
        available_balance: Decimal,
        /// Start of the minute bucket, epoch milliseconds
        bucket_ms: i64,
    },

    /// A ledger event was appended and the projection moved.
    #[serde(rename_all = "camelCase")]
    LedgerPosted {
        account_id: String,
        event_id: String,
        event_type: String,
    },
}

impl DomainEvent {
    /// Creates a SnapshotUpdated event.
    pub fn snapshot_updated(
        account_id: String,
        value: Decimal,
        available_balance: Decimal,
        bucket_at: DateTime<Utc>,
    ) -> Self {
        Self::SnapshotUpdated {
            account_id,
            value,
            available_balance,
            bucket_ms: bucket_at.timestamp_millis(),
        }
    }

    /// Creates a LedgerPosted event.
    pub fn ledger_posted(account_id: String, event_id: String, event_type: String) -> Self {
        Self::LedgerPosted {
            account_id,
            event_id,
            event_type,
        }
    }

    pub fn account_id(&self) -> &str {
        match self {
            Self::SnapshotUpdated { account_id, .. } | Self::LedgerPosted { account_id, .. } => {
                account_id
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::EVENT_TYPE_DEPOSIT;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn test_snapshot_updated_serialization() {
        let bucket = Utc.with_ymd_and_hms(2024, 1, 1, 0, 1, 0).unwrap();
        let event = DomainEvent::snapshot_updated(
            "acc1".to_string(),
            dec!(1250.5),
            dec!(250.5),
            bucket,
        );

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("snapshot_updated"));
        assert!(json.contains("bucketMs"));

        let deserialized: DomainEvent = serde_json::from_str(&json).unwrap();
        match deserialized {
            DomainEvent::SnapshotUpdated {
                account_id,
                value,
                available_balance,
                bucket_ms,
            } => {
                assert_eq!(account_id, "acc1");
                assert_eq!(value, dec!(1250.5));
                assert_eq!(available_balance, dec!(250.5));
                assert_eq!(bucket_ms, 1_704_067_260_000);
            }
            _ => panic!("Expected SnapshotUpdated"),
        }
    }

    #[test]
    fn test_ledger_posted_account_id() {
        let event = DomainEvent::ledger_posted(
            "acc2".to_string(),
            "evt-1".to_string(),
            EVENT_TYPE_DEPOSIT.to_string(),
        );
        assert_eq!(event.account_id(), "acc2");
    }
}
