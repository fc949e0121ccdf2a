use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::SqliteConnection;
use log::debug;
use std::sync::Arc;

use super::model::{UserBalanceDB, WalletDB};
use crate::db::{get_connection, DbPool};
use crate::errors::StorageError;
use crate::utils::{format_decimal, format_timestamp, parse_decimal};
use tradeledger_core::errors::Result;
use tradeledger_core::ledger::LedgerBalances;
use tradeledger_core::legacy::{
    LegacyBalanceReaderTrait, LegacyBalanceRecord, LegacyBalances, MirrorPlan,
};

pub struct LegacyBalanceRepository {
    pool: Arc<DbPool>,
}

impl LegacyBalanceRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

impl LegacyBalanceReaderTrait for LegacyBalanceRepository {
    fn get_legacy_balances(&self, account_id: &str) -> Result<LegacyBalanceRecord> {
        let mut conn = get_connection(&self.pool)?;
        load_legacy_record(&mut conn, account_id)
    }
}

/// Reads the wallet and user-balance rows of an account on `conn`.
pub fn load_legacy_record(
    conn: &mut SqliteConnection,
    target_account_id: &str,
) -> Result<LegacyBalanceRecord> {
    use crate::schema::{user_balances, wallets};

    let wallet = wallets::table
        .find(target_account_id)
        .select(WalletDB::as_select())
        .first(conn)
        .optional()
        .map_err(StorageError::from)?;
    let user_balance = user_balances::table
        .find(target_account_id)
        .select(UserBalanceDB::as_select())
        .first(conn)
        .optional()
        .map_err(StorageError::from)?;

    Ok(LegacyBalanceRecord {
        account_id: target_account_id.to_string(),
        wallet_balance: wallet
            .map(|w| parse_decimal(&w.balance))
            .transpose()?,
        user_balance: user_balance
            .as_ref()
            .map(LegacyBalances::try_from)
            .transpose()?,
    })
}

/// Brings the legacy records in line with `next`, writing only the values
/// that moved by at least the ledger epsilon. Missing rows are created.
///
/// Must run on the connection of the posting transaction.
pub fn mirror_balances(
    conn: &mut SqliteConnection,
    target_account_id: &str,
    next: &LedgerBalances,
    now: DateTime<Utc>,
) -> Result<MirrorPlan> {
    use crate::schema::{user_balances, wallets};

    let plan = load_legacy_record(conn, target_account_id)?.plan_mirror(next);
    let updated_at = format_timestamp(now);

    if let Some(balance) = plan.wallet_balance {
        diesel::replace_into(wallets::table)
            .values(WalletDB {
                account_id: target_account_id.to_string(),
                balance: format_decimal(balance),
                updated_at: updated_at.clone(),
            })
            .execute(conn)
            .map_err(StorageError::from)?;
    }

    if let Some(target) = plan.user_balance {
        diesel::replace_into(user_balances::table)
            .values(UserBalanceDB {
                account_id: target_account_id.to_string(),
                cash: format_decimal(target.cash),
                holdings: format_decimal(target.holdings),
                profit: format_decimal(target.profit),
                updated_at,
            })
            .execute(conn)
            .map_err(StorageError::from)?;
    }

    if !plan.is_noop() {
        debug!(
            "Mirrored ledger balances of account {} into legacy records (wallet: {}, user balance: {})",
            target_account_id,
            plan.wallet_balance.is_some(),
            plan.user_balance.is_some()
        );
    }
    Ok(plan)
}
