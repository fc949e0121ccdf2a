//! Utility functions for SQLite storage operations.
//!
//! Chunking helpers for `IN (...)` lists plus the TEXT encodings used for
//! decimals and timestamps.

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::errors::StorageError;

/// Maximum number of parameters for SQLite IN (...) queries.
///
/// SQLite has a compile-time limit on the number of parameters in a SQL statement,
/// typically around 999 (SQLITE_MAX_VARIABLE_NUMBER). To stay safely under this limit
/// and leave room for other parameters in the query, we use 500 as our chunk size.
pub const SQLITE_MAX_PARAMS_CHUNK: usize = 500;

/// Fixed-width UTC timestamp format; sorts lexicographically in time order.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Chunk a slice into smaller slices for batch SQLite queries.
pub fn chunk_for_sqlite<T>(items: &[T]) -> impl Iterator<Item = &[T]> {
    items.chunks(SQLITE_MAX_PARAMS_CHUNK)
}

pub fn format_timestamp(instant: DateTime<Utc>) -> String {
    instant.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StorageError> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| StorageError::Decode(format!("invalid timestamp '{}': {}", raw, e)))
}

pub fn format_decimal(value: Decimal) -> String {
    value.normalize().to_string()
}

pub fn parse_decimal(raw: &str) -> Result<Decimal, StorageError> {
    Decimal::from_str(raw)
        .map_err(|e| StorageError::Decode(format!("invalid decimal '{}': {}", raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn test_timestamp_text_roundtrip_and_ordering() {
        let earlier = Utc.with_ymd_and_hms(2024, 1, 9, 23, 59, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();
        let a = format_timestamp(earlier);
        let b = format_timestamp(later);
        assert_eq!(a, "2024-01-09T23:59:00Z");
        assert!(a < b);
        assert_eq!(parse_timestamp(&b).unwrap(), later);
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_decimal_text() {
        assert_eq!(format_decimal(dec!(800.00000000)), "800");
        assert_eq!(parse_decimal("0.12345678").unwrap(), dec!(0.12345678));
        assert!(parse_decimal("abc").is_err());
    }

    #[test]
    fn test_chunk_for_sqlite_empty() {
        let items: Vec<i32> = vec![];
        let chunks: Vec<_> = chunk_for_sqlite(&items).collect();
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_chunk_for_sqlite_over_limit() {
        let items: Vec<i32> = (0..1200).collect();
        let chunks: Vec<_> = chunk_for_sqlite(&items).collect();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), SQLITE_MAX_PARAMS_CHUNK); // 500
        assert_eq!(chunks[1].len(), SQLITE_MAX_PARAMS_CHUNK); // 500
        assert_eq!(chunks[2].len(), 200); // remaining 200
    }
}
