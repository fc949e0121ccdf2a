//! Ledger domain models.

use chrono::{DateTime, Utc};
use log::warn;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::{LEDGER_DECIMAL_PRECISION, LEDGER_EPSILON};

/// The six balance fields tracked per account.
///
/// Used both for current balances and for the signed deltas of a posting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerBalances {
    pub cash: Decimal,
    pub holdings: Decimal,
    pub profit: Decimal,
    pub asset_profit: Decimal,
    pub copy_profit: Decimal,
    pub funded_profit: Decimal,
}

impl LedgerBalances {
    pub const FIELD_NAMES: [&'static str; 6] = [
        "cash",
        "holdings",
        "profit",
        "asset_profit",
        "copy_profit",
        "funded_profit",
    ];

    /// Cash-only balances, everything else zero.
    pub fn from_cash(cash: Decimal) -> Self {
        Self {
            cash,
            ..Self::default()
        }
    }

    pub fn values(&self) -> [Decimal; 6] {
        [
            self.cash,
            self.holdings,
            self.profit,
            self.asset_profit,
            self.copy_profit,
            self.funded_profit,
        ]
    }

    fn from_values(values: [Decimal; 6]) -> Self {
        Self {
            cash: values[0],
            holdings: values[1],
            profit: values[2],
            asset_profit: values[3],
            copy_profit: values[4],
            funded_profit: values[5],
        }
    }

    /// Rounds every field to the ledger precision.
    pub fn rounded(&self) -> Self {
        Self::from_values(self.values().map(|v| v.round_dp(LEDGER_DECIMAL_PRECISION)))
    }

    /// Returns `self + deltas`, each field rounded to the ledger precision,
    /// or `None` when any field leaves the `Decimal` range.
    pub fn checked_apply(&self, deltas: &LedgerBalances) -> Option<Self> {
        let current = self.values();
        let deltas = deltas.values();
        let mut next = [Decimal::ZERO; 6];
        for (i, slot) in next.iter_mut().enumerate() {
            *slot = current[i]
                .checked_add(deltas[i])?
                .round_dp(LEDGER_DECIMAL_PRECISION);
        }
        Some(Self::from_values(next))
    }

    /// Like [`checked_apply`](Self::checked_apply) but saturating at the
    /// `Decimal` bounds. Used when replaying stored events.
    pub fn apply(&self, deltas: &LedgerBalances) -> Self {
        let current = self.values();
        let deltas = deltas.values();
        Self::from_values(std::array::from_fn(|i| {
            current[i]
                .saturating_add(deltas[i])
                .round_dp(LEDGER_DECIMAL_PRECISION)
        }))
    }

    /// Returns `self - other` per field, saturating.
    pub fn minus(&self, other: &LedgerBalances) -> Self {
        let a = self.values();
        let b = other.values();
        Self::from_values(std::array::from_fn(|i| a[i].saturating_sub(b[i])))
    }

    pub fn checked_investing_total(&self) -> Option<Decimal> {
        self.holdings
            .checked_add(self.profit)?
            .checked_add(self.asset_profit)
            .map(|total| total.round_dp(LEDGER_DECIMAL_PRECISION))
    }

    /// Holdings plus both profit fields, saturating at the `Decimal` bounds.
    pub fn investing_total(&self) -> Decimal {
        self.holdings
            .saturating_add(self.profit)
            .saturating_add(self.asset_profit)
            .round_dp(LEDGER_DECIMAL_PRECISION)
    }

    /// Profit as a percentage of holdings; zero when holdings are (nearly) zero.
    pub fn pnl_percent(&self) -> Decimal {
        if self.holdings.abs() < LEDGER_EPSILON {
            return Decimal::ZERO;
        }
        match self
            .profit
            .checked_div(self.holdings)
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        {
            Some(pct) => pct.round_dp(LEDGER_DECIMAL_PRECISION),
            None => {
                warn!(
                    "pnl_percent overflow for profit {} / holdings {}",
                    self.profit, self.holdings
                );
                Decimal::ZERO
            }
        }
    }

    /// Fields whose values differ from `other` by at least the ledger epsilon.
    pub fn drift_from(&self, other: &LedgerBalances) -> Vec<BalanceDrift> {
        Self::FIELD_NAMES
            .iter()
            .zip(self.values().into_iter().zip(other.values()))
            .filter(|(_, (expected, actual))| {
                expected.saturating_sub(*actual).abs() >= LEDGER_EPSILON
            })
            .map(|(field, (expected, actual))| BalanceDrift {
                field: (*field).to_string(),
                expected,
                actual,
            })
            .collect()
    }

    pub fn is_zero(&self) -> bool {
        self.values().iter().all(|v| v.is_zero())
    }
}

/// A single field that disagrees between two balance representations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceDrift {
    pub field: String,
    pub expected: Decimal,
    pub actual: Decimal,
}

/// Current-state materialization of an account's ledger.
///
/// `investing_total` and `pnl_percent` are always derived from `balances`;
/// construct through [`AccountProjection::seeded`] or
/// [`AccountProjection::with_balances`] so they cannot drift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountProjection {
    pub id: String,
    pub account_id: String,
    pub balances: LedgerBalances,
    pub investing_total: Decimal,
    pub pnl_percent: Decimal,
    pub as_of: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AccountProjection {
    /// Builds a fresh projection from seed balances.
    pub fn seeded(account_id: &str, seed: LedgerBalances, now: DateTime<Utc>) -> Self {
        let balances = seed.rounded();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            account_id: account_id.to_string(),
            investing_total: balances.investing_total(),
            pnl_percent: balances.pnl_percent(),
            balances,
            as_of: now,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns the next projection state for new balances.
    pub fn with_balances(
        &self,
        balances: LedgerBalances,
        as_of: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: self.id.clone(),
            account_id: self.account_id.clone(),
            investing_total: balances.investing_total(),
            pnl_percent: balances.pnl_percent(),
            balances,
            as_of,
            created_at: self.created_at,
            updated_at: now,
        }
    }

    /// Whether the stored derived fields match the stored balances.
    pub fn derived_fields_consistent(&self) -> bool {
        self.investing_total
            .saturating_sub(self.balances.investing_total())
            .abs()
            < LEDGER_EPSILON
            && self
                .pnl_percent
                .saturating_sub(self.balances.pnl_percent())
                .abs()
                < LEDGER_EPSILON
    }
}

/// One immutable, atomically-applied balance change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEvent {
    pub id: String,
    pub account_id: String,
    pub projection_id: String,
    /// Position of this event in the account's ledger, starting at 1
    pub sequence: i64,
    pub event_type: String,
    pub source_type: Option<String>,
    pub source_id: Option<String>,
    pub status: String,
    pub occurred_at: DateTime<Utc>,
    pub deltas: LedgerBalances,
    /// Balances after applying `deltas` to the previous projection
    pub resulting: LedgerBalances,
    pub metadata: Option<Value>,
    pub admin_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl LedgerEvent {
    /// Balances immediately before this event was applied.
    pub fn previous_balances(&self) -> LedgerBalances {
        self.resulting.minus(&self.deltas)
    }

    /// `"type:id"` reference to the originating record, when known.
    pub fn source_ref(&self) -> Option<String> {
        match (&self.source_type, &self.source_id) {
            (Some(t), Some(id)) => Some(format!("{}:{}", t, id)),
            (Some(t), None) => Some(t.clone()),
            (None, Some(id)) => Some(id.clone()),
            (None, None) => None,
        }
    }
}

/// Caller-supplied attributes of a posting.
///
/// Every delta defaults to zero when omitted. Deserializes from the flat
/// snake_case maps used by trade execution and admin tooling.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostingAttributes {
    pub occurred_at: Option<String>,
    pub cash_delta: Option<Decimal>,
    pub holding_delta: Option<Decimal>,
    pub profit_delta: Option<Decimal>,
    pub asset_profit_delta: Option<Decimal>,
    pub copy_profit_delta: Option<Decimal>,
    pub funded_profit_delta: Option<Decimal>,
    pub source_type: Option<String>,
    pub source_id: Option<String>,
    pub status: Option<String>,
    pub metadata: Option<Value>,
    pub admin_id: Option<String>,
    /// Skip writing the legacy wallet / user-balance mirror
    pub suppress_mirror: bool,
    /// Permit the posting to take cash below zero
    pub allow_overdraft: bool,
}

impl PostingAttributes {
    /// The six deltas, zero-defaulted and rounded to the ledger precision.
    pub fn deltas(&self) -> LedgerBalances {
        let or_zero = |v: Option<Decimal>| v.unwrap_or(Decimal::ZERO);
        LedgerBalances {
            cash: or_zero(self.cash_delta),
            holdings: or_zero(self.holding_delta),
            profit: or_zero(self.profit_delta),
            asset_profit: or_zero(self.asset_profit_delta),
            copy_profit: or_zero(self.copy_profit_delta),
            funded_profit: or_zero(self.funded_profit_delta),
        }
        .rounded()
    }
}

/// Outcome of planning a posting against the current projection.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedPosting {
    pub projection: AccountProjection,
    pub event: LedgerEvent,
}

/// Result of replaying an account's ledger against its projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerVerification {
    pub account_id: String,
    pub event_count: usize,
    /// Balances reconstructed from the first event's pre-state plus all deltas
    pub replayed: LedgerBalances,
    pub projected: LedgerBalances,
    pub drift: Vec<BalanceDrift>,
    /// Sequence numbers whose resulting balances do not follow from their predecessor
    pub broken_links: Vec<i64>,
    pub derived_fields_consistent: bool,
}

impl LedgerVerification {
    pub fn is_consistent(&self) -> bool {
        self.drift.is_empty() && self.broken_links.is_empty() && self.derived_fields_consistent
    }
}
