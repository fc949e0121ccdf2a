use chrono::Utc;
use diesel::prelude::*;
use diesel::sql_query;
use diesel::sql_types::{BigInt, Text};
use diesel::SqliteConnection;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

use super::model::{AccountIdRow, PositionDB};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::{IntoCore, StorageError};
use crate::utils::{format_decimal, format_timestamp};
use tradeledger_core::errors::{Error, Result};
use tradeledger_core::portfolio::holdings::{HeldPosition, HoldingsReaderTrait};

// Accounts with a wallet or a position, one keyset page at a time.
const ACTIVE_ACCOUNTS_SQL: &str = "SELECT account_id FROM ( \
        SELECT account_id FROM wallets \
        UNION \
        SELECT account_id FROM positions \
    ) WHERE account_id > ? ORDER BY account_id LIMIT ?";

pub struct HoldingsRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl HoldingsRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }

    /// Sets the quantity and market price of one instrument in an account.
    pub async fn upsert_position(&self, position: HeldPosition) -> Result<()> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                use crate::schema::positions::dsl::*;

                let row = PositionDB {
                    id: Uuid::now_v7().to_string(),
                    account_id: position.account_id.clone(),
                    symbol: position.symbol.clone(),
                    quantity: format_decimal(position.quantity),
                    market_price: format_decimal(position.market_price),
                    updated_at: format_timestamp(Utc::now()),
                };
                diesel::insert_into(positions)
                    .values(&row)
                    .on_conflict((account_id, symbol))
                    .do_update()
                    .set((
                        quantity.eq(&row.quantity),
                        market_price.eq(&row.market_price),
                        updated_at.eq(&row.updated_at),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }

    /// Reprices every position in `symbol_filter` across all accounts.
    pub async fn update_market_price(&self, symbol_filter: &str, price: Decimal) -> Result<usize> {
        let symbol_owned = symbol_filter.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                use crate::schema::positions::dsl::*;

                let updated = diesel::update(positions.filter(symbol.eq(&symbol_owned)))
                    .set((
                        market_price.eq(format_decimal(price)),
                        updated_at.eq(format_timestamp(Utc::now())),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(updated)
            })
            .await
    }
}

impl HoldingsReaderTrait for HoldingsRepository {
    fn get_positions(&self, target_account_id: &str) -> Result<Vec<HeldPosition>> {
        use crate::schema::positions::dsl::*;

        let mut conn = get_connection(&self.pool)?;
        let rows = positions
            .filter(account_id.eq(target_account_id))
            .order(symbol.asc())
            .select(PositionDB::as_select())
            .load::<PositionDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter()
            .map(|row| HeldPosition::try_from(row).map_err(Error::from))
            .collect()
    }

    fn list_active_accounts(&self, after: Option<&str>, limit: usize) -> Result<Vec<String>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = sql_query(ACTIVE_ACCOUNTS_SQL)
            .bind::<Text, _>(after.unwrap_or(""))
            .bind::<BigInt, _>(limit as i64)
            .load::<AccountIdRow>(&mut conn)
            .into_core()?;
        Ok(rows.into_iter().map(|row| row.account_id).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_pool, run_migrations, spawn_writer};
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    fn create_test_repository() -> (HoldingsRepository, Arc<DbPool>, tempfile::TempDir) {
        let temp_dir = tempdir().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test.db").to_string_lossy().to_string();
        let pool = create_pool(&db_path).expect("Failed to create pool");
        run_migrations(&pool).expect("Failed to run migrations");
        let writer = spawn_writer((*pool).clone());
        (
            HoldingsRepository::new(pool.clone(), writer),
            pool,
            temp_dir,
        )
    }

    fn position(account: &str, symbol: &str, quantity: Decimal, price: Decimal) -> HeldPosition {
        HeldPosition {
            account_id: account.to_string(),
            symbol: symbol.to_string(),
            quantity,
            market_price: price,
        }
    }

    #[tokio::test]
    async fn test_upsert_replaces_existing_position() {
        let (repo, _pool, _dir) = create_test_repository();
        repo.upsert_position(position("acc-1", "AAPL", dec!(2), dec!(100)))
            .await
            .unwrap();
        repo.upsert_position(position("acc-1", "AAPL", dec!(3), dec!(110)))
            .await
            .unwrap();
        repo.upsert_position(position("acc-1", "MSFT", dec!(1), dec!(50)))
            .await
            .unwrap();

        let held = repo.get_positions("acc-1").unwrap();
        assert_eq!(
            held,
            vec![
                position("acc-1", "AAPL", dec!(3), dec!(110)),
                position("acc-1", "MSFT", dec!(1), dec!(50)),
            ]
        );
    }

    #[tokio::test]
    async fn test_update_market_price() {
        let (repo, _pool, _dir) = create_test_repository();
        repo.upsert_position(position("acc-1", "AAPL", dec!(2), dec!(100)))
            .await
            .unwrap();
        repo.upsert_position(position("acc-2", "AAPL", dec!(1), dec!(100)))
            .await
            .unwrap();

        assert_eq!(repo.update_market_price("AAPL", dec!(120)).await.unwrap(), 2);
        assert_eq!(repo.get_positions("acc-2").unwrap()[0].market_price, dec!(120));
    }

    #[tokio::test]
    async fn test_active_accounts_union_wallets_and_positions() {
        let (repo, pool, _dir) = create_test_repository();
        {
            let mut conn = get_connection(&pool).unwrap();
            sql_query(
                "INSERT INTO wallets (account_id, balance, updated_at) VALUES \
                 ('a', '10', '2024-01-01T00:00:00Z'), ('c', '0', '2024-01-01T00:00:00Z')",
            )
            .execute(&mut conn)
            .unwrap();
        }
        repo.upsert_position(position("b", "AAPL", dec!(1), dec!(1)))
            .await
            .unwrap();
        repo.upsert_position(position("c", "AAPL", dec!(1), dec!(1)))
            .await
            .unwrap();

        assert_eq!(
            repo.list_active_accounts(None, 2).unwrap(),
            vec!["a".to_string(), "b".to_string()]
        );
        assert_eq!(
            repo.list_active_accounts(Some("b"), 2).unwrap(),
            vec!["c".to_string()]
        );
        assert!(repo.list_active_accounts(Some("c"), 2).unwrap().is_empty());
    }
}
