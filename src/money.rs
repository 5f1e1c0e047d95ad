// 2.0: monetary value type. amount plus currency, arithmetic only between
// matching currencies. subtraction below zero fails rather than saturating.

use crate::types::CurrencyCode;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    amount: Decimal,
    currency: CurrencyCode,
}

impl Money {
    #[must_use]
    pub fn new(amount: Decimal, currency: CurrencyCode) -> Result<Self, MoneyError> {
        if amount < Decimal::ZERO {
            return Err(MoneyError::NegativeAmount(amount));
        }
        Ok(Self { amount, currency })
    }

    pub fn zero(currency: CurrencyCode) -> Self {
        Self {
            amount: Decimal::ZERO,
            currency,
        }
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> CurrencyCode {
        self.currency
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    fn check_currency(&self, other: &Money) -> Result<(), MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch {
                left: self.currency,
                right: other.currency,
            });
        }
        Ok(())
    }

    pub fn add(&self, other: Money) -> Result<Money, MoneyError> {
        self.check_currency(&other)?;
        Ok(Self {
            amount: self.amount + other.amount,
            currency: self.currency,
        })
    }

    pub fn sub(&self, other: Money) -> Result<Money, MoneyError> {
        self.check_currency(&other)?;
        if other.amount > self.amount {
            return Err(MoneyError::Overdraw {
                requested: other.amount,
                available: self.amount,
            });
        }
        Ok(Self {
            amount: self.amount - other.amount,
            currency: self.currency,
        })
    }

    // factor must be non-negative; a negative product would break the invariant
    pub fn mul(&self, factor: Decimal) -> Result<Money, MoneyError> {
        let product = self.amount * factor;
        if product < Decimal::ZERO {
            return Err(MoneyError::NegativeAmount(product));
        }
        Ok(Self {
            amount: product,
            currency: self.currency,
        })
    }

    // round half-up to the currency's precision, the convention for payouts
    pub fn rounded(&self) -> Money {
        Self {
            amount: self.amount.round_dp_with_strategy(
                self.currency.precision(),
                RoundingStrategy::MidpointAwayFromZero,
            ),
            currency: self.currency,
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoneyError {
    #[error("Currency mismatch: {left} vs {right}")]
    CurrencyMismatch {
        left: CurrencyCode,
        right: CurrencyCode,
    },

    #[error("Amount would go negative: requested {requested}, available {available}")]
    Overdraw {
        requested: Decimal,
        available: Decimal,
    },

    #[error("Negative amount: {0}")]
    NegativeAmount(Decimal),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn usd(amount: Decimal) -> Money {
        Money::new(amount, CurrencyCode::Usd).unwrap()
    }

    #[test]
    fn rejects_negative_construction() {
        let result = Money::new(dec!(-1), CurrencyCode::Usd);
        assert!(matches!(result, Err(MoneyError::NegativeAmount(_))));
    }

    #[test]
    fn add_same_currency() {
        let total = usd(dec!(100)).add(usd(dec!(50.25))).unwrap();
        assert_eq!(total.amount(), dec!(150.25));
    }

    #[test]
    fn add_currency_mismatch() {
        let eur = Money::new(dec!(10), CurrencyCode::Eur).unwrap();
        let result = usd(dec!(10)).add(eur);
        assert!(matches!(result, Err(MoneyError::CurrencyMismatch { .. })));
    }

    #[test]
    fn sub_below_zero_fails() {
        let result = usd(dec!(10)).sub(usd(dec!(20)));
        assert!(matches!(result, Err(MoneyError::Overdraw { .. })));
        // and the original is untouched
        assert_eq!(usd(dec!(10)).amount(), dec!(10));
    }

    #[test]
    fn sub_to_exactly_zero() {
        let zero = usd(dec!(10)).sub(usd(dec!(10))).unwrap();
        assert!(zero.is_zero());
    }

    #[test]
    fn mul_and_round() {
        let commission = usd(dec!(100)).mul(dec!(0.012)).unwrap().rounded();
        assert_eq!(commission.amount(), dec!(1.20));

        let fractional = usd(dec!(33.333)).mul(dec!(0.015)).unwrap().rounded();
        assert_eq!(fractional.amount(), dec!(0.50));
    }
}
