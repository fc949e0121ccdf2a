use super::holdings_model::HeldPosition;
use crate::errors::Result;

/// Read access to positions and the set of accounts worth sampling.
pub trait HoldingsReaderTrait: Send + Sync {
    /// Current positions of an account with their market prices.
    fn get_positions(&self, account_id: &str) -> Result<Vec<HeldPosition>>;

    /// Accounts that own a wallet or at least one position, ordered by id,
    /// strictly after `after`, at most `limit` of them.
    fn list_active_accounts(&self, after: Option<&str>, limit: usize) -> Result<Vec<String>>;
}
