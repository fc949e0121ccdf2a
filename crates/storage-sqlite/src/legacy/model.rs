//! Database models for legacy balance records.

use diesel::prelude::*;

use crate::errors::StorageError;
use crate::utils::parse_decimal;
use tradeledger_core::legacy::LegacyBalances;

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = crate::schema::wallets)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct WalletDB {
    pub account_id: String,
    pub balance: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = crate::schema::user_balances)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct UserBalanceDB {
    pub account_id: String,
    pub cash: String,
    pub holdings: String,
    pub profit: String,
    pub updated_at: String,
}

impl TryFrom<&UserBalanceDB> for LegacyBalances {
    type Error = StorageError;

    fn try_from(db: &UserBalanceDB) -> Result<Self, Self::Error> {
        Ok(Self {
            cash: parse_decimal(&db.cash)?,
            holdings: parse_decimal(&db.holdings)?,
            profit: parse_decimal(&db.profit)?,
        })
    }
}
