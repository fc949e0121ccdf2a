//! Legacy wallet and flat user-balance records.
//!
//! Read by anyone through [`LegacyBalanceRepository`]; written only by
//! [`mirror_balances`] from inside a ledger posting transaction.

mod model;
mod repository;

pub use model::{UserBalanceDB, WalletDB};
pub use repository::{load_legacy_record, mirror_balances, LegacyBalanceRepository};
