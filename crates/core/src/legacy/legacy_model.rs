//! Legacy (denormalized) balance records read by other subsystems.
//!
//! The ledger projection is the authority. The wallet record and the flat
//! user-balance record are write-through mirrors kept for older readers.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::LEDGER_EPSILON;
use crate::ledger::LedgerBalances;

/// Cash / holdings / profit as stored in the flat user-balance record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyBalances {
    pub cash: Decimal,
    pub holdings: Decimal,
    pub profit: Decimal,
}

impl From<&LedgerBalances> for LegacyBalances {
    fn from(balances: &LedgerBalances) -> Self {
        Self {
            cash: balances.cash,
            holdings: balances.holdings,
            profit: balances.profit,
        }
    }
}

/// Everything the legacy stores know about one account.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyBalanceRecord {
    pub account_id: String,
    /// Live wallet balance, `None` when the account has no wallet
    pub wallet_balance: Option<Decimal>,
    /// Flat user-balance row, `None` when absent
    pub user_balance: Option<LegacyBalances>,
}

impl LegacyBalanceRecord {
    /// Available cash after reconciling the wallet against the flat record.
    pub fn available_balance(&self) -> Decimal {
        authoritative_balance(
            self.wallet_balance.unwrap_or(Decimal::ZERO),
            self.user_balance.map(|b| b.cash).unwrap_or(Decimal::ZERO),
        )
    }

    /// Seed for a brand-new ledger projection.
    pub fn seed_balances(&self) -> LedgerBalances {
        let user = self.user_balance.unwrap_or_default();
        LedgerBalances {
            cash: self.available_balance(),
            holdings: user.holdings,
            profit: user.profit,
            ..LedgerBalances::default()
        }
    }

    /// Decides which mirror writes a new projection state requires.
    pub fn plan_mirror(&self, next: &LedgerBalances) -> MirrorPlan {
        let wallet_balance = match self.wallet_balance {
            Some(current) if !differs(current, next.cash) => None,
            _ => Some(next.cash),
        };

        let target = LegacyBalances::from(next);
        let user_balance = match self.user_balance {
            Some(current)
                if !differs(current.cash, target.cash)
                    && !differs(current.holdings, target.holdings)
                    && !differs(current.profit, target.profit) =>
            {
                None
            }
            _ => Some(target),
        };

        MirrorPlan {
            wallet_balance,
            user_balance,
        }
    }
}

/// Writes needed to bring the legacy records in line with the projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MirrorPlan {
    pub wallet_balance: Option<Decimal>,
    pub user_balance: Option<LegacyBalances>,
}

impl MirrorPlan {
    pub fn is_noop(&self) -> bool {
        self.wallet_balance.is_none() && self.user_balance.is_none()
    }
}

/// Picks the available balance from two candidate sources.
///
/// The primary (wallet) figure wins unless it is zero while the secondary
/// figure is not; some accounts still carry their cash only in the older
/// flat record.
pub fn authoritative_balance(primary: Decimal, secondary: Decimal) -> Decimal {
    if primary.is_zero() && !secondary.is_zero() {
        secondary
    } else {
        primary
    }
}

fn differs(current: Decimal, next: Decimal) -> bool {
    current.saturating_sub(next).abs() >= LEDGER_EPSILON
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_authoritative_balance_prefers_wallet() {
        assert_eq!(authoritative_balance(dec!(100), dec!(40)), dec!(100));
        assert_eq!(authoritative_balance(dec!(100), dec!(0)), dec!(100));
    }

    #[test]
    fn test_authoritative_balance_falls_back_when_wallet_is_zero() {
        assert_eq!(authoritative_balance(dec!(0), dec!(40)), dec!(40));
        assert_eq!(authoritative_balance(dec!(0), dec!(0)), dec!(0));
    }

    #[test]
    fn test_seed_balances_from_legacy_record() {
        let record = LegacyBalanceRecord {
            account_id: "acc".to_string(),
            wallet_balance: Some(dec!(0)),
            user_balance: Some(LegacyBalances {
                cash: dec!(1000),
                holdings: dec!(300),
                profit: dec!(12.5),
            }),
        };
        let seed = record.seed_balances();
        assert_eq!(seed.cash, dec!(1000));
        assert_eq!(seed.holdings, dec!(300));
        assert_eq!(seed.profit, dec!(12.5));
        assert_eq!(seed.asset_profit, dec!(0));
    }

    #[test]
    fn test_seed_balances_without_legacy_rows_is_zero() {
        let record = LegacyBalanceRecord {
            account_id: "acc".to_string(),
            ..Default::default()
        };
        assert!(record.seed_balances().is_zero());
    }

    #[test]
    fn test_plan_mirror_skips_sub_epsilon_changes() {
        let record = LegacyBalanceRecord {
            account_id: "acc".to_string(),
            wallet_balance: Some(dec!(800)),
            user_balance: Some(LegacyBalances {
                cash: dec!(800),
                holdings: dec!(200),
                profit: dec!(0),
            }),
        };
        let next = LedgerBalances {
            cash: dec!(800.000000001),
            holdings: dec!(200),
            ..Default::default()
        };
        assert!(record.plan_mirror(&next).is_noop());
    }

    #[test]
    fn test_plan_mirror_writes_changed_and_missing_records() {
        let record = LegacyBalanceRecord {
            account_id: "acc".to_string(),
            wallet_balance: Some(dec!(1000)),
            user_balance: None,
        };
        let next = LedgerBalances {
            cash: dec!(800),
            holdings: dec!(200),
            ..Default::default()
        };
        let plan = record.plan_mirror(&next);
        assert_eq!(plan.wallet_balance, Some(dec!(800)));
        assert_eq!(
            plan.user_balance,
            Some(LegacyBalances {
                cash: dec!(800),
                holdings: dec!(200),
                profit: dec!(0),
            })
        );
    }
}
