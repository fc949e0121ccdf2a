//! Core error types for the Tradeledger accounting core.
//!
//! This module defines database-agnostic error types. Storage-specific errors
//! (from Diesel, SQLite, etc.) are converted to these types by the storage layer.

use chrono::ParseError as ChronoParseError;
use rust_decimal::Decimal;
use thiserror::Error;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the accounting core.
///
/// Database-specific errors are wrapped in string form to keep this type
/// database-agnostic.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database operation failed: {0}")]
    Database(#[from] DatabaseError),

    #[error("Input validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Ledger operation failed: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Snapshot compaction failed: {0}")]
    Compaction(#[from] CompactionError),

    #[error("Failed to load configuration: {0}")]
    ConfigIO(String),

    #[error("Invalid configuration value: {0}")]
    InvalidConfigValue(String),

    #[error("Repository error: {0}")]
    Repository(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl Error {
    /// Whether the caller may simply retry the failed operation.
    ///
    /// Lock timeouts and busy/transaction failures are transient; validation,
    /// insufficient funds and constraint violations are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Ledger(LedgerError::LockTimeout { .. }) => true,
            Error::Database(DatabaseError::TransactionFailed(_))
            | Error::Database(DatabaseError::Busy(_))
            | Error::Database(DatabaseError::ConnectionFailed(_)) => true,
            _ => false,
        }
    }
}

/// Database-agnostic error type for storage operations.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to establish a database connection.
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to create or configure the connection pool.
    #[error("Failed to create database pool: {0}")]
    PoolCreationFailed(String),

    /// A database query failed to execute.
    #[error("Database query failed: {0}")]
    QueryFailed(String),

    /// The requested record was not found.
    #[error("Record not found: {0}")]
    NotFound(String),

    /// A unique constraint was violated (e.g., duplicate key).
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// A foreign key constraint was violated.
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// The database was locked by another writer for longer than the busy timeout.
    #[error("Database is busy: {0}")]
    Busy(String),

    /// A database transaction failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Database migration failed.
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Internal/unexpected database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

/// Errors raised by the ledger service while posting or reading balances.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error(
        "Insufficient funds in account {account_id}: cash {available} cannot absorb debit {requested}"
    )]
    InsufficientFunds {
        account_id: String,
        available: Decimal,
        requested: Decimal,
    },

    #[error("Timed out after {waited_ms}ms waiting for the ledger lock of account {account_id}")]
    LockTimeout { account_id: String, waited_ms: u64 },

    #[error("No balance projection exists for account {0}")]
    ProjectionNotFound(String),

    #[error("Invalid posting attributes: {0}")]
    InvalidAttributes(String),
}

/// Errors raised while compacting the snapshot store.
#[derive(Error, Debug)]
pub enum CompactionError {
    #[error("Refusing to apply delete set for account {account_id}: {reason}")]
    UnsafeDeleteSet { account_id: String, reason: String },
}

/// Validation errors for user input and data parsing.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Required field '{0}' is missing")]
    MissingField(String),

    #[error("Failed to parse decimal number: {0}")]
    DecimalParse(#[from] rust_decimal::Error),

    #[error("Failed to parse date/time: {0}")]
    DateTimeParse(#[from] ChronoParseError),
}

// === From implementations for common error types ===

impl From<rust_decimal::Error> for Error {
    fn from(err: rust_decimal::Error) -> Self {
        Error::Validation(ValidationError::DecimalParse(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Validation(ValidationError::InvalidInput(err.to_string()))
    }
}

impl From<ChronoParseError> for Error {
    fn from(err: ChronoParseError) -> Self {
        Error::Validation(ValidationError::DateTimeParse(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_lock_timeout_is_retryable() {
        let err = Error::Ledger(LedgerError::LockTimeout {
            account_id: "acc-1".to_string(),
            waited_ms: 10_000,
        });
        assert!(err.is_retryable());
    }

    #[test]
    fn test_insufficient_funds_is_not_retryable() {
        let err = Error::Ledger(LedgerError::InsufficientFunds {
            account_id: "acc-1".to_string(),
            available: dec!(10),
            requested: dec!(25),
        });
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("acc-1"));
    }

    #[test]
    fn test_busy_database_is_retryable() {
        let err = Error::Database(DatabaseError::Busy("database is locked".to_string()));
        assert!(err.is_retryable());
        let err = Error::Database(DatabaseError::UniqueViolation("dup".to_string()));
        assert!(!err.is_retryable());
    }
}
