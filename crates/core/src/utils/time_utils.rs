use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};

/// Truncates an instant down to the start of its minute.
///
/// This is the deduplication key of the snapshot store: every capture inside
/// the same calendar minute maps to the same bucket.
pub fn truncate_to_minute(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant
        .with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(instant)
}

/// Parses a caller-supplied occurrence timestamp.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS` (read as UTC)
/// and a bare `YYYY-MM-DD` (midnight UTC). Returns `None` for anything else.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Resolves an optional caller timestamp, falling back to `now` when it is
/// missing or unparseable.
pub fn resolve_occurred_at(raw: Option<&str>, now: DateTime<Utc>) -> DateTime<Utc> {
    match raw {
        Some(value) => parse_timestamp(value).unwrap_or_else(|| {
            log::debug!("Unparseable occurrence timestamp '{}', using now", value);
            now
        }),
        None => now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_to_minute() {
        let t = Utc.with_ymd_and_hms(2024, 3, 5, 14, 27, 59).unwrap()
            + chrono::Duration::milliseconds(999);
        let truncated = truncate_to_minute(t);
        assert_eq!(
            truncated,
            Utc.with_ymd_and_hms(2024, 3, 5, 14, 27, 0).unwrap()
        );
        assert_eq!(truncate_to_minute(truncated), truncated);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(parse_timestamp("2024-01-02T03:04:05Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-02T05:04:05+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-02 03:04:05"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-02T03:04:05"), Some(expected));
        assert_eq!(
            parse_timestamp("2024-01-02"),
            Some(Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp("2024-13-45"), None);
    }

    #[test]
    fn test_resolve_occurred_at_falls_back_to_now() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        assert_eq!(resolve_occurred_at(None, now), now);
        assert_eq!(resolve_occurred_at(Some("not a date"), now), now);
        assert_eq!(
            resolve_occurred_at(Some("2024-05-31 08:00:00"), now),
            Utc.with_ymd_and_hms(2024, 5, 31, 8, 0, 0).unwrap()
        );
    }
}
