use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::SqliteConnection;
use std::sync::Arc;

use super::model::{AccountProjectionDB, LedgerEventDB};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::legacy::mirror_balances;
use crate::schema::{account_projections, ledger_events};
use tradeledger_core::errors::{Error, LedgerError, Result};
use tradeledger_core::ledger::{
    AccountProjection, LedgerEvent, LedgerRepositoryTrait, PlannedPosting, PostingPlanner,
};

pub struct LedgerRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl LedgerRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        LedgerRepository { pool, writer }
    }
}

fn load_projection(
    conn: &mut SqliteConnection,
    target_account_id: &str,
) -> Result<Option<AccountProjection>> {
    let row = account_projections::table
        .filter(account_projections::account_id.eq(target_account_id))
        .select(AccountProjectionDB::as_select())
        .first(conn)
        .optional()
        .map_err(StorageError::from)?;
    Ok(row.map(AccountProjection::try_from).transpose()?)
}

fn insert_projection(conn: &mut SqliteConnection, projection: &AccountProjection) -> Result<()> {
    diesel::insert_into(account_projections::table)
        .values(AccountProjectionDB::from(projection))
        .execute(conn)
        .map_err(StorageError::from)?;
    Ok(())
}

fn next_sequence(conn: &mut SqliteConnection, target_account_id: &str) -> Result<i64> {
    let current: Option<i64> = ledger_events::table
        .filter(ledger_events::account_id.eq(target_account_id))
        .select(diesel::dsl::max(ledger_events::sequence))
        .first(conn)
        .map_err(StorageError::from)?;
    Ok(current.unwrap_or(0) + 1)
}

#[async_trait]
impl LedgerRepositoryTrait for LedgerRepository {
    fn get_projection(&self, account_id: &str) -> Result<Option<AccountProjection>> {
        let mut conn = get_connection(&self.pool)?;
        load_projection(&mut conn, account_id)
    }

    async fn create_projection_if_absent(
        &self,
        seed: AccountProjection,
    ) -> Result<AccountProjection> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<AccountProjection> {
                if let Some(existing) = load_projection(conn, &seed.account_id)? {
                    return Ok(existing);
                }
                insert_projection(conn, &seed)?;
                Ok(seed)
            })
            .await
    }

    async fn apply_posting(
        &self,
        account_id: &str,
        seed: Option<AccountProjection>,
        planner: PostingPlanner,
        mirror_legacy: bool,
    ) -> Result<PlannedPosting> {
        let account_id_owned = account_id.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<PlannedPosting> {
                let current = match load_projection(conn, &account_id_owned)? {
                    Some(existing) => existing,
                    None => {
                        let seed = seed.ok_or_else(|| {
                            LedgerError::ProjectionNotFound(account_id_owned.clone())
                        })?;
                        insert_projection(conn, &seed)?;
                        seed
                    }
                };

                let sequence = next_sequence(conn, &account_id_owned)?;
                let planned = planner(&current, sequence)?;

                diesel::update(account_projections::table.find(&current.id))
                    .set(&AccountProjectionDB::from(&planned.projection))
                    .execute(conn)
                    .map_err(StorageError::from)?;

                diesel::insert_into(ledger_events::table)
                    .values(LedgerEventDB::try_from(&planned.event)?)
                    .execute(conn)
                    .map_err(StorageError::from)?;

                if mirror_legacy {
                    mirror_balances(
                        conn,
                        &account_id_owned,
                        &planned.projection.balances,
                        Utc::now(),
                    )?;
                }

                Ok(planned)
            })
            .await
    }

    fn list_events(&self, account_id: &str) -> Result<Vec<LedgerEvent>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = ledger_events::table
            .filter(ledger_events::account_id.eq(account_id))
            .order(ledger_events::sequence.asc())
            .select(LedgerEventDB::as_select())
            .load::<LedgerEventDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter()
            .map(|row| LedgerEvent::try_from(row).map_err(Error::from))
            .collect()
    }
}
