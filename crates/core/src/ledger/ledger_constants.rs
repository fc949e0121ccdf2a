/// Event types posted by the platform's callers. The ledger accepts any
/// non-empty string; these are the ones the rest of the system uses.
pub const EVENT_TYPE_TRADE_BUY: &str = "trade_buy";
pub const EVENT_TYPE_TRADE_SELL: &str = "trade_sell";
pub const EVENT_TYPE_DEPOSIT: &str = "deposit";
pub const EVENT_TYPE_WITHDRAWAL: &str = "withdrawal";
pub const EVENT_TYPE_ADMIN_ADJUSTMENT: &str = "admin_adjustment";
pub const EVENT_TYPE_COPY_TRADE_PROFIT: &str = "copy_trade_profit";
pub const EVENT_TYPE_FUNDED_PROFIT: &str = "funded_profit";
pub const EVENT_TYPE_FEE: &str = "fee";

/// Source types referenced by ledger events.
pub const SOURCE_TYPE_ORDER: &str = "order";
pub const SOURCE_TYPE_ADMIN: &str = "admin";
