//! Legacy balance records: reconciliation rules and the reader contract.

mod legacy_model;
mod legacy_traits;

pub use legacy_model::*;
pub use legacy_traits::LegacyBalanceReaderTrait;
