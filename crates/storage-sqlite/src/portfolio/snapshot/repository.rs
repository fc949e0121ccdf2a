use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::SqliteConnection;
use log::debug;
use rust_decimal::Decimal;
use std::sync::Arc;

use super::model::{SnapshotPointDB, SnapshotRefDB};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::schema::portfolio_snapshots;
use crate::utils::{chunk_for_sqlite, format_decimal, format_timestamp};
use tradeledger_core::errors::{Error, Result};
use tradeledger_core::portfolio::snapshot::{SnapshotPoint, SnapshotRef, SnapshotRepositoryTrait};

pub struct SnapshotRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl SnapshotRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }

    pub fn count_points(&self, target_account_id: &str) -> Result<i64> {
        use crate::schema::portfolio_snapshots::dsl::*;

        let mut conn = get_connection(&self.pool)?;
        let count = portfolio_snapshots
            .filter(account_id.eq(target_account_id))
            .count()
            .get_result(&mut conn)
            .map_err(StorageError::from)?;
        Ok(count)
    }
}

fn into_refs(rows: Vec<SnapshotRefDB>) -> Result<Vec<SnapshotRef>> {
    rows.into_iter()
        .map(|row| SnapshotRef::try_from(row).map_err(Error::from))
        .collect()
}

#[async_trait]
impl SnapshotRepositoryTrait for SnapshotRepository {
    fn get_point(
        &self,
        target_account_id: &str,
        target_bucket_at: DateTime<Utc>,
    ) -> Result<Option<SnapshotPoint>> {
        use crate::schema::portfolio_snapshots::dsl::*;

        let mut conn = get_connection(&self.pool)?;
        let row = portfolio_snapshots
            .filter(account_id.eq(target_account_id))
            .filter(bucket_at.eq(format_timestamp(target_bucket_at)))
            .select(SnapshotPointDB::as_select())
            .first(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        Ok(row.map(SnapshotPoint::try_from).transpose()?)
    }

    async fn insert_point(&self, point: SnapshotPoint) -> Result<SnapshotPoint> {
        let row = SnapshotPointDB::from(&point);
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<SnapshotPoint> {
                // A plain insert: a taken bucket surfaces as a unique violation.
                diesel::insert_into(portfolio_snapshots::table)
                    .values(&row)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(point)
            })
            .await
    }

    async fn update_point_values(
        &self,
        point_id: &str,
        new_value: Decimal,
        new_available_balance: Decimal,
        new_updated_at: DateTime<Utc>,
    ) -> Result<()> {
        let point_id_owned = point_id.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                use crate::schema::portfolio_snapshots::dsl::*;

                diesel::update(portfolio_snapshots.find(&point_id_owned))
                    .set((
                        value.eq(format_decimal(new_value)),
                        available_balance.eq(format_decimal(new_available_balance)),
                        updated_at.eq(format_timestamp(new_updated_at)),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }

    fn get_points(
        &self,
        target_account_id: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<SnapshotPoint>> {
        use crate::schema::portfolio_snapshots::dsl::*;

        let mut conn = get_connection(&self.pool)?;
        let mut query = portfolio_snapshots
            .filter(account_id.eq(target_account_id))
            .into_boxed();
        if let Some(from) = from {
            query = query.filter(bucket_at.ge(format_timestamp(from)));
        }
        if let Some(to) = to {
            query = query.filter(bucket_at.le(format_timestamp(to)));
        }

        let rows = query
            .order(bucket_at.asc())
            .select(SnapshotPointDB::as_select())
            .load::<SnapshotPointDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter()
            .map(|row| SnapshotPoint::try_from(row).map_err(Error::from))
            .collect()
    }

    fn list_refs_in_range(
        &self,
        target_account_id: &str,
        start: Option<DateTime<Utc>>,
        end: DateTime<Utc>,
    ) -> Result<Vec<SnapshotRef>> {
        use crate::schema::portfolio_snapshots::dsl::*;

        let mut conn = get_connection(&self.pool)?;
        let mut query = portfolio_snapshots
            .filter(account_id.eq(target_account_id))
            .filter(bucket_at.lt(format_timestamp(end)))
            .into_boxed();
        if let Some(start) = start {
            query = query.filter(bucket_at.ge(format_timestamp(start)));
        }

        let rows = query
            .order((bucket_at.desc(), id.desc()))
            .select((id, bucket_at))
            .load::<SnapshotRefDB>(&mut conn)
            .map_err(StorageError::from)?;
        into_refs(rows)
    }

    fn get_latest_ref(&self, target_account_id: &str) -> Result<Option<SnapshotRef>> {
        use crate::schema::portfolio_snapshots::dsl::*;

        let mut conn = get_connection(&self.pool)?;
        let row = portfolio_snapshots
            .filter(account_id.eq(target_account_id))
            .order((bucket_at.desc(), id.desc()))
            .select((id, bucket_at))
            .first::<SnapshotRefDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        Ok(row.map(SnapshotRef::try_from).transpose()?)
    }

    fn list_accounts_with_snapshots(
        &self,
        after: Option<&str>,
        limit: usize,
    ) -> Result<Vec<String>> {
        use crate::schema::portfolio_snapshots::dsl::*;

        let mut conn = get_connection(&self.pool)?;
        let mut query = portfolio_snapshots
            .select(account_id)
            .distinct()
            .into_boxed();
        if let Some(after) = after {
            query = query.filter(account_id.gt(after.to_string()));
        }
        let accounts = query
            .order(account_id.asc())
            .limit(limit as i64)
            .load::<String>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(accounts)
    }

    async fn delete_points(&self, ids: &[String]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let ids_owned = ids.to_vec();
        let deleted = self
            .writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                use crate::schema::portfolio_snapshots::dsl::*;

                let mut deleted = 0;
                for chunk in chunk_for_sqlite(&ids_owned) {
                    deleted += diesel::delete(portfolio_snapshots.filter(id.eq_any(chunk)))
                        .execute(conn)
                        .map_err(StorageError::from)?;
                }
                Ok(deleted)
            })
            .await?;
        debug!("Deleted {} snapshot points", deleted);
        Ok(deleted)
    }
}
