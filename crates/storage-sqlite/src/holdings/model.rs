use diesel::prelude::*;
use diesel::sql_types::Text;

use crate::errors::StorageError;
use crate::utils::parse_decimal;
use tradeledger_core::portfolio::holdings::HeldPosition;

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = crate::schema::positions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PositionDB {
    pub id: String,
    pub account_id: String,
    pub symbol: String,
    pub quantity: String,
    pub market_price: String,
    pub updated_at: String,
}

impl TryFrom<PositionDB> for HeldPosition {
    type Error = StorageError;

    fn try_from(db: PositionDB) -> Result<Self, Self::Error> {
        Ok(Self {
            quantity: parse_decimal(&db.quantity)?,
            market_price: parse_decimal(&db.market_price)?,
            account_id: db.account_id,
            symbol: db.symbol,
        })
    }
}

#[derive(Debug, QueryableByName)]
pub(crate) struct AccountIdRow {
    #[diesel(sql_type = Text)]
    pub account_id: String,
}
