//! Database models for account projections and ledger events.

use diesel::prelude::*;
use rust_decimal::Decimal;

use crate::errors::StorageError;
use crate::utils::{format_decimal, format_timestamp, parse_decimal, parse_timestamp};
use tradeledger_core::ledger::{AccountProjection, LedgerBalances, LedgerEvent};

fn balances_from_text(values: [&str; 6]) -> Result<LedgerBalances, StorageError> {
    let [cash, holdings, profit, asset_profit, copy_profit, funded_profit] = values;
    Ok(LedgerBalances {
        cash: parse_decimal(cash)?,
        holdings: parse_decimal(holdings)?,
        profit: parse_decimal(profit)?,
        asset_profit: parse_decimal(asset_profit)?,
        copy_profit: parse_decimal(copy_profit)?,
        funded_profit: parse_decimal(funded_profit)?,
    })
}

fn text(value: Decimal) -> String {
    format_decimal(value)
}

/// Database model for account projections
#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset, Identifiable)]
#[diesel(table_name = crate::schema::account_projections)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct AccountProjectionDB {
    pub id: String,
    pub account_id: String,
    pub cash: String,
    pub holdings: String,
    pub profit: String,
    pub asset_profit: String,
    pub copy_profit: String,
    pub funded_profit: String,
    pub investing_total: String,
    pub pnl_percent: String,
    pub as_of: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&AccountProjection> for AccountProjectionDB {
    fn from(domain: &AccountProjection) -> Self {
        let b = &domain.balances;
        Self {
            id: domain.id.clone(),
            account_id: domain.account_id.clone(),
            cash: text(b.cash),
            holdings: text(b.holdings),
            profit: text(b.profit),
            asset_profit: text(b.asset_profit),
            copy_profit: text(b.copy_profit),
            funded_profit: text(b.funded_profit),
            investing_total: text(domain.investing_total),
            pnl_percent: text(domain.pnl_percent),
            as_of: format_timestamp(domain.as_of),
            created_at: format_timestamp(domain.created_at),
            updated_at: format_timestamp(domain.updated_at),
        }
    }
}

impl TryFrom<AccountProjectionDB> for AccountProjection {
    type Error = StorageError;

    fn try_from(db: AccountProjectionDB) -> Result<Self, Self::Error> {
        Ok(Self {
            balances: balances_from_text([
                &db.cash,
                &db.holdings,
                &db.profit,
                &db.asset_profit,
                &db.copy_profit,
                &db.funded_profit,
            ])?,
            investing_total: parse_decimal(&db.investing_total)?,
            pnl_percent: parse_decimal(&db.pnl_percent)?,
            as_of: parse_timestamp(&db.as_of)?,
            created_at: parse_timestamp(&db.created_at)?,
            updated_at: parse_timestamp(&db.updated_at)?,
            id: db.id,
            account_id: db.account_id,
        })
    }
}

/// Database model for ledger events
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = crate::schema::ledger_events)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct LedgerEventDB {
    pub id: String,
    pub account_id: String,
    pub projection_id: String,
    pub sequence: i64,
    pub event_type: String,
    pub source_type: Option<String>,
    pub source_id: Option<String>,
    pub status: String,
    pub occurred_at: String,
    pub cash_delta: String,
    pub holdings_delta: String,
    pub profit_delta: String,
    pub asset_profit_delta: String,
    pub copy_profit_delta: String,
    pub funded_profit_delta: String,
    pub cash_after: String,
    pub holdings_after: String,
    pub profit_after: String,
    pub asset_profit_after: String,
    pub copy_profit_after: String,
    pub funded_profit_after: String,
    pub metadata: Option<String>,
    pub admin_id: Option<String>,
    pub created_at: String,
}

impl TryFrom<&LedgerEvent> for LedgerEventDB {
    type Error = StorageError;

    fn try_from(domain: &LedgerEvent) -> Result<Self, Self::Error> {
        let metadata = domain
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| StorageError::Decode(format!("ledger event metadata: {}", e)))?;
        let d = &domain.deltas;
        let r = &domain.resulting;
        Ok(Self {
            id: domain.id.clone(),
            account_id: domain.account_id.clone(),
            projection_id: domain.projection_id.clone(),
            sequence: domain.sequence,
            event_type: domain.event_type.clone(),
            source_type: domain.source_type.clone(),
            source_id: domain.source_id.clone(),
            status: domain.status.clone(),
            occurred_at: format_timestamp(domain.occurred_at),
            cash_delta: text(d.cash),
            holdings_delta: text(d.holdings),
            profit_delta: text(d.profit),
            asset_profit_delta: text(d.asset_profit),
            copy_profit_delta: text(d.copy_profit),
            funded_profit_delta: text(d.funded_profit),
            cash_after: text(r.cash),
            holdings_after: text(r.holdings),
            profit_after: text(r.profit),
            asset_profit_after: text(r.asset_profit),
            copy_profit_after: text(r.copy_profit),
            funded_profit_after: text(r.funded_profit),
            metadata,
            admin_id: domain.admin_id.clone(),
            created_at: format_timestamp(domain.created_at),
        })
    }
}

impl TryFrom<LedgerEventDB> for LedgerEvent {
    type Error = StorageError;

    fn try_from(db: LedgerEventDB) -> Result<Self, Self::Error> {
        let metadata = db
            .metadata
            .as_deref()
            .map(serde_json::from_str::<serde_json::Value>)
            .transpose()
            .map_err(|e| StorageError::Decode(format!("ledger event {} metadata: {}", db.id, e)))?;
        Ok(Self {
            deltas: balances_from_text([
                &db.cash_delta,
                &db.holdings_delta,
                &db.profit_delta,
                &db.asset_profit_delta,
                &db.copy_profit_delta,
                &db.funded_profit_delta,
            ])?,
            resulting: balances_from_text([
                &db.cash_after,
                &db.holdings_after,
                &db.profit_after,
                &db.asset_profit_after,
                &db.copy_profit_after,
                &db.funded_profit_after,
            ])?,
            occurred_at: parse_timestamp(&db.occurred_at)?,
            created_at: parse_timestamp(&db.created_at)?,
            metadata,
            id: db.id,
            account_id: db.account_id,
            projection_id: db.projection_id,
            sequence: db.sequence,
            event_type: db.event_type,
            source_type: db.source_type,
            source_id: db.source_id,
            status: db.status,
            admin_id: db.admin_id,
        })
    }
}
