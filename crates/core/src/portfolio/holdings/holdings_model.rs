use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, ValidationError};

/// One instrument held by an account, priced at the current market price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeldPosition {
    pub account_id: String,
    pub symbol: String,
    pub quantity: Decimal,
    pub market_price: Decimal,
}

impl HeldPosition {
    pub fn market_value(&self) -> Option<Decimal> {
        self.quantity.checked_mul(self.market_price)
    }
}

/// Sum of `quantity x market_price` over all positions.
pub fn holdings_value(positions: &[HeldPosition]) -> Result<Decimal> {
    positions.iter().try_fold(Decimal::ZERO, |total, position| {
        position
            .market_value()
            .and_then(|value| total.checked_add(value))
            .ok_or_else(|| {
                ValidationError::InvalidInput(format!(
                    "Holdings value overflow at {} for account {}",
                    position.symbol, position.account_id
                ))
                .into()
            })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn position(symbol: &str, quantity: Decimal, price: Decimal) -> HeldPosition {
        HeldPosition {
            account_id: "acc".to_string(),
            symbol: symbol.to_string(),
            quantity,
            market_price: price,
        }
    }

    #[test]
    fn test_holdings_value_sums_market_values() {
        let positions = vec![
            position("AAPL", dec!(2), dec!(150.25)),
            position("BTC", dec!(0.5), dec!(60000)),
        ];
        assert_eq!(holdings_value(&positions).unwrap(), dec!(30300.50));
    }

    #[test]
    fn test_holdings_value_of_nothing_is_zero() {
        assert_eq!(holdings_value(&[]).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_holdings_value_overflow_is_an_error() {
        let positions = vec![position("X", Decimal::MAX, dec!(2))];
        assert!(holdings_value(&positions).is_err());
    }
}
