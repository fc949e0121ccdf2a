//! SQLite storage implementation for TradeLedger.
//!
//! This crate provides all database-related functionality using Diesel ORM with SQLite.
//! It implements the repository traits defined in `tradeledger-core` and contains:
//! - Database connection pooling and management
//! - Diesel migrations
//! - Repository implementations for the ledger, legacy balances, holdings and snapshots
//! - Database-specific model types (with Diesel derives)
//!
//! # Architecture
//!
//! This crate is the only place in the workspace where Diesel dependencies exist.
//! The core crate is database-agnostic and works with traits.
//!
//! ```text
//!        core (domain)
//!              │
//!              ▼
//!   storage-sqlite (this crate)
//!              │
//!              ▼
//!          SQLite DB
//! ```

pub mod db;
pub mod errors;
pub mod schema;
pub mod utils;

// Repository implementations
pub mod holdings;
pub mod ledger;
pub mod legacy;
pub mod portfolio;

// Re-export database utilities
pub use db::{
    create_pool, get_connection, get_db_path, init, run_migrations, spawn_writer, DbConnection,
    DbPool, WriteHandle,
};

// Re-export storage errors and conversion helpers
pub use errors::{IntoCore, StorageError};

pub use holdings::HoldingsRepository;
pub use ledger::LedgerRepository;
pub use legacy::LegacyBalanceRepository;
pub use portfolio::snapshot::SnapshotRepository;

// Re-export from tradeledger-core for convenience
pub use tradeledger_core::errors::{DatabaseError, Error, Result};
