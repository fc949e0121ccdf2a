use rust_decimal::Decimal;

/// Fractional digits kept for every ledger balance and delta.
pub const LEDGER_DECIMAL_PRECISION: u32 = 8;

/// Drift threshold for ledger comparisons (1e-8).
pub const LEDGER_EPSILON: Decimal = Decimal::from_parts(1, 0, 0, false, 8);

/// Change threshold for snapshot updates (0.01). Coarser than the ledger's.
pub const SNAPSHOT_EPSILON: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Decimal precision for stored snapshot values
pub const SNAPSHOT_DECIMAL_PRECISION: u32 = 8;

/// Accounts loaded per page by batch jobs (capture sweep, compaction).
pub const ACCOUNT_BATCH_SIZE: usize = 200;

/// Snapshot ids removed per delete statement during compaction.
pub const COMPACTION_DELETE_BATCH_SIZE: usize = 500;

/// Default status stamped on ledger events.
pub const DEFAULT_EVENT_STATUS: &str = "posted";
