//! Ledger module - append-only balance events and the account projection.

mod account_locks;
pub mod ledger_calculator;
mod ledger_constants;
mod ledger_model;
mod ledger_service;
mod ledger_traits;

pub use account_locks::{AccountLockGuard, AccountLocks, DEFAULT_LOCK_TIMEOUT};
pub use ledger_calculator::{plan_posting, replay_balances, verify_ledger};
pub use ledger_constants::*;
pub use ledger_model::*;
pub use ledger_service::LedgerService;
pub use ledger_traits::{LedgerRepositoryTrait, LedgerServiceTrait, PostingPlanner};

#[cfg(test)]
mod ledger_calculator_tests;
