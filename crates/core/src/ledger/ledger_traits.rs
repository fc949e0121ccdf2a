//! Ledger repository and service traits.

use async_trait::async_trait;

use super::ledger_model::{
    AccountProjection, LedgerEvent, LedgerVerification, PlannedPosting, PostingAttributes,
};
use crate::errors::Result;

/// Computes the next state from the locked current projection and the
/// sequence number the new event will take.
pub type PostingPlanner =
    Box<dyn FnOnce(&AccountProjection, i64) -> Result<PlannedPosting> + Send + 'static>;

/// Storage contract of the ledger: account projections plus the append-only
/// event log.
///
/// Implementations must run [`apply_posting`](Self::apply_posting) as a single
/// atomic unit: if any step fails nothing becomes visible.
#[async_trait]
pub trait LedgerRepositoryTrait: Send + Sync {
    /// Returns the projection of an account, if it has been created.
    fn get_projection(&self, account_id: &str) -> Result<Option<AccountProjection>>;

    /// Stores `seed` unless the account already has a projection, and returns
    /// whichever projection is stored afterwards.
    async fn create_projection_if_absent(
        &self,
        seed: AccountProjection,
    ) -> Result<AccountProjection>;

    /// Atomically loads the current projection (inserting `seed` first when
    /// the account has none), runs `planner`, persists the planned projection,
    /// appends the planned event and, when `mirror_legacy` is set, writes the
    /// new cash/holdings/profit into the legacy balance records.
    async fn apply_posting(
        &self,
        account_id: &str,
        seed: Option<AccountProjection>,
        planner: PostingPlanner,
        mirror_legacy: bool,
    ) -> Result<PlannedPosting>;

    /// All events of an account ordered by sequence.
    fn list_events(&self, account_id: &str) -> Result<Vec<LedgerEvent>>;
}

/// The only account-mutating entry point of the platform.
#[async_trait]
pub trait LedgerServiceTrait: Send + Sync {
    /// Returns the account projection, creating it from legacy balances if absent.
    async fn ensure_account(&self, account_id: &str) -> Result<AccountProjection>;

    /// Appends one ledger event and moves the projection atomically.
    async fn post(
        &self,
        account_id: &str,
        event_type: &str,
        attributes: PostingAttributes,
    ) -> Result<LedgerEvent>;

    fn get_projection(&self, account_id: &str) -> Result<Option<AccountProjection>>;

    fn list_events(&self, account_id: &str) -> Result<Vec<LedgerEvent>>;

    /// Replays the account's events and reports drift against the projection.
    fn verify_account(&self, account_id: &str) -> Result<LedgerVerification>;
}
