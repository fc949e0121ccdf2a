//! Worker configuration read from `TL_*` environment variables.

use std::time::Duration;

use tradeledger_core::portfolio::compaction::CompactionPolicy;
use tradeledger_core::{Error, Result};
use tradeledger_storage_sqlite::db::DEFAULT_DB_PATH;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub db_path: String,
    pub json_logs: bool,
    pub capture_interval: Duration,
    pub compaction_interval: Duration,
    pub compaction_policy: CompactionPolicy,
    pub ledger_lock_timeout: Duration,
    pub capture_throttle: Duration,
}

impl Config {
    /// Loads `.env` when present, then reads the process environment.
    pub fn from_env() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                return Err(Error::ConfigIO(e.to_string()));
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = CompactionPolicy::default();
        let compaction_policy = CompactionPolicy {
            fine_days: bounded(&lookup, "TL_FINE_DAYS", defaults.fine_days, MAX_DAYS)?,
            mid_days: bounded(&lookup, "TL_MID_DAYS", defaults.mid_days, MAX_DAYS)?,
            coarse_days: bounded(&lookup, "TL_COARSE_DAYS", defaults.coarse_days, MAX_DAYS)?,
            mid_bucket_minutes: bounded(
                &lookup,
                "TL_MID_BUCKET_MINUTES",
                defaults.mid_bucket_minutes,
                MAX_BUCKET_MINUTES,
            )?,
            coarse_bucket_minutes: bounded(
                &lookup,
                "TL_COARSE_BUCKET_MINUTES",
                defaults.coarse_bucket_minutes,
                MAX_BUCKET_MINUTES,
            )?,
            archive_bucket_minutes: bounded(
                &lookup,
                "TL_ARCHIVE_BUCKET_MINUTES",
                defaults.archive_bucket_minutes,
                MAX_BUCKET_MINUTES,
            )?,
        }
        .normalized();

        let secs = |key: &str, default: i64| -> Result<Duration> {
            bounded(&lookup, key, default, MAX_SECS).map(|v| Duration::from_secs(v as u64))
        };

        Ok(Self {
            db_path: lookup("TL_DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string()),
            json_logs: lookup("TL_LOG_FORMAT")
                .map(|f| f.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
            capture_interval: secs("TL_CAPTURE_INTERVAL_SECS", 60)?,
            compaction_interval: secs("TL_COMPACTION_INTERVAL_SECS", 86_400)?,
            compaction_policy,
            ledger_lock_timeout: secs("TL_LEDGER_LOCK_TIMEOUT_SECS", 10)?,
            capture_throttle: secs("TL_CAPTURE_THROTTLE_SECS", 30)?,
        })
    }
}

/// Upper bound of the day-valued retention knobs (100 years).
const MAX_DAYS: i64 = 36_500;
/// Upper bound of the bucket widths (one year of minutes).
const MAX_BUCKET_MINUTES: i64 = 525_600;
/// Upper bound of the interval and timeout knobs (one year of seconds).
const MAX_SECS: i64 = 31_536_000;

fn bounded<F>(lookup: &F, key: &str, default: i64, max: i64) -> Result<i64>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    match raw.trim().parse::<i64>() {
        Ok(value) if (1..=max).contains(&value) => Ok(value),
        _ => Err(Error::InvalidConfigValue(format!(
            "{} must be an integer between 1 and {}, got '{}'",
            key, max, raw
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.db_path, DEFAULT_DB_PATH);
        assert!(!config.json_logs);
        assert_eq!(config.capture_interval, Duration::from_secs(60));
        assert_eq!(config.compaction_interval, Duration::from_secs(86_400));
        assert_eq!(config.compaction_policy, CompactionPolicy::default());
        assert_eq!(config.capture_throttle, Duration::from_secs(30));
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("TL_DB_PATH", "/tmp/x.db"),
            ("TL_LOG_FORMAT", "JSON"),
            ("TL_CAPTURE_INTERVAL_SECS", "15"),
            ("TL_MID_BUCKET_MINUTES", "10"),
        ])
        .unwrap();
        assert_eq!(config.db_path, "/tmp/x.db");
        assert!(config.json_logs);
        assert_eq!(config.capture_interval, Duration::from_secs(15));
        assert_eq!(config.compaction_policy.mid_bucket_minutes, 10);
    }

    #[test]
    fn test_rejects_non_positive_and_garbage() {
        for raw in ["0", "-5", "soon"] {
            let err = config(&[("TL_CAPTURE_INTERVAL_SECS", raw)]).unwrap_err();
            assert!(matches!(err, Error::InvalidConfigValue(_)), "{}", raw);
        }
        assert!(config(&[("TL_FINE_DAYS", "0")]).is_err());
    }

    #[test]
    fn test_rejects_values_above_bounds() {
        for (key, raw) in [
            ("TL_COARSE_DAYS", "100000000"),
            ("TL_FINE_DAYS", "9223372036854775807"),
            ("TL_ARCHIVE_BUCKET_MINUTES", "525601"),
            ("TL_COMPACTION_INTERVAL_SECS", "31536001"),
        ] {
            let err = config(&[(key, raw)]).unwrap_err();
            assert!(matches!(err, Error::InvalidConfigValue(_)), "{}", key);
        }

        let config = config(&[("TL_FINE_DAYS", "36500"), ("TL_COARSE_DAYS", "36500")]).unwrap();
        assert_eq!(config.compaction_policy.fine_days, 36_500);
        assert_eq!(config.compaction_policy.coarse_days, 36_502);
    }

    #[test]
    fn test_tier_ordering_is_normalized() {
        let config = config(&[("TL_FINE_DAYS", "40"), ("TL_MID_DAYS", "10")]).unwrap();
        let policy = config.compaction_policy;
        assert!(policy.mid_days > policy.fine_days);
        assert!(policy.coarse_days > policy.mid_days);
    }
}
