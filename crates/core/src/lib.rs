//! TradeLedger Core - Domain entities, services, and traits.
//!
//! This crate contains the accounting core: the balance ledger, snapshot
//! capture and snapshot compaction. It is database-agnostic and defines
//! traits that are implemented by the `storage-sqlite` crate.

pub mod constants;
pub mod errors;
pub mod events;
pub mod ledger;
pub mod legacy;
pub mod portfolio;
pub mod utils;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
