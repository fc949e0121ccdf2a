use super::legacy_model::LegacyBalanceRecord;
use crate::errors::Result;

/// Read access to the legacy wallet and flat user-balance records.
///
/// Writes to these records happen only inside ledger postings.
pub trait LegacyBalanceReaderTrait: Send + Sync {
    /// Returns the legacy balances of an account. Missing rows are reported
    /// as `None` fields, not as errors.
    fn get_legacy_balances(&self, account_id: &str) -> Result<LegacyBalanceRecord>;
}
