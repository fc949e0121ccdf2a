//! Database model for minute-bucketed value snapshots.

use diesel::prelude::*;

use crate::errors::StorageError;
use crate::utils::{format_decimal, format_timestamp, parse_decimal, parse_timestamp};
use tradeledger_core::portfolio::snapshot::{SnapshotPoint, SnapshotRef};

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = crate::schema::portfolio_snapshots)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SnapshotPointDB {
    pub id: String,
    pub account_id: String,
    pub bucket_at: String,
    pub value: String,
    pub available_balance: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&SnapshotPoint> for SnapshotPointDB {
    fn from(domain: &SnapshotPoint) -> Self {
        Self {
            id: domain.id.clone(),
            account_id: domain.account_id.clone(),
            bucket_at: format_timestamp(domain.bucket_at),
            value: format_decimal(domain.value),
            available_balance: format_decimal(domain.available_balance),
            created_at: format_timestamp(domain.created_at),
            updated_at: format_timestamp(domain.updated_at),
        }
    }
}

impl TryFrom<SnapshotPointDB> for SnapshotPoint {
    type Error = StorageError;

    fn try_from(db: SnapshotPointDB) -> Result<Self, Self::Error> {
        Ok(Self {
            bucket_at: parse_timestamp(&db.bucket_at)?,
            value: parse_decimal(&db.value)?,
            available_balance: parse_decimal(&db.available_balance)?,
            created_at: parse_timestamp(&db.created_at)?,
            updated_at: parse_timestamp(&db.updated_at)?,
            id: db.id,
            account_id: db.account_id,
        })
    }
}

/// Id and bucket of a snapshot row; what compaction scans.
#[derive(Debug, Clone, Queryable)]
pub struct SnapshotRefDB {
    pub id: String,
    pub bucket_at: String,
}

impl TryFrom<SnapshotRefDB> for SnapshotRef {
    type Error = StorageError;

    fn try_from(db: SnapshotRefDB) -> Result<Self, Self::Error> {
        Ok(Self {
            bucket_at: parse_timestamp(&db.bucket_at)?,
            id: db.id,
        })
    }
}
