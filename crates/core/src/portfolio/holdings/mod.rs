//! Held positions and the reader contract used to value an account.

mod holdings_model;
mod holdings_traits;

pub use holdings_model::*;
pub use holdings_traits::HoldingsReaderTrait;
