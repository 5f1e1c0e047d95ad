// 3.0: decimal odds. must be >= 1.0. parlay combination is plain multiplication.
// american conversion round-trips within integer rounding.

use crate::money::{Money, MoneyError};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Odds(Decimal);

impl Odds {
    #[must_use]
    pub fn new(value: Decimal) -> Option<Self> {
        if value >= Decimal::ONE {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn new_unchecked(value: Decimal) -> Self {
        debug_assert!(value >= Decimal::ONE);
        Self(value)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    // parlay combination: product of leg odds
    pub fn combine(&self, other: Odds) -> Odds {
        Self(self.0 * other.0)
    }

    // payout = stake * odds, rounded to currency precision
    pub fn payout(&self, stake: Money) -> Result<Money, MoneyError> {
        Ok(stake.mul(self.0)?.rounded())
    }

    // profit = payout - stake
    pub fn profit(&self, stake: Money) -> Result<Money, MoneyError> {
        Ok(stake.mul(self.0 - Decimal::ONE)?.rounded())
    }

    // American format: +150 means 1.5x profit on the stake, -200 means risk
    // 200 to win 100. odds of exactly 1.0 have no american representation.
    pub fn to_american(&self) -> Option<i32> {
        if self.0 == Decimal::ONE {
            return None;
        }
        let american = if self.0 >= Decimal::TWO {
            (self.0 - Decimal::ONE) * Decimal::ONE_HUNDRED
        } else {
            -(Decimal::ONE_HUNDRED / (self.0 - Decimal::ONE))
        };
        american.round().to_i32()
    }

    pub fn from_american(american: i32) -> Option<Self> {
        if american.abs() < 100 {
            return None;
        }
        let a = Decimal::from(american);
        let decimal = if american > 0 {
            a / Decimal::ONE_HUNDRED + Decimal::ONE
        } else {
            Decimal::ONE_HUNDRED / a.abs() + Decimal::ONE
        };
        Self::new(decimal)
    }
}

impl fmt::Display for Odds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CurrencyCode;
    use rust_decimal_macros::dec;

    fn usd(amount: Decimal) -> Money {
        Money::new(amount, CurrencyCode::Usd).unwrap()
    }

    #[test]
    fn rejects_below_one() {
        assert!(Odds::new(dec!(0.99)).is_none());
        assert!(Odds::new(dec!(1.0)).is_some());
    }

    #[test]
    fn payout_and_profit() {
        let odds = Odds::new(dec!(2.5)).unwrap();
        assert_eq!(odds.payout(usd(dec!(100))).unwrap().amount(), dec!(250));
        assert_eq!(odds.profit(usd(dec!(100))).unwrap().amount(), dec!(150));
    }

    #[test]
    fn parlay_combination() {
        let combined = Odds::new(dec!(2.0))
            .unwrap()
            .combine(Odds::new(dec!(1.8)).unwrap());
        assert_eq!(combined.value(), dec!(3.6));
    }

    #[test]
    fn american_conversion() {
        assert_eq!(Odds::new(dec!(2.0)).unwrap().to_american(), Some(100));
        assert_eq!(Odds::new(dec!(2.5)).unwrap().to_american(), Some(150));
        assert_eq!(Odds::new(dec!(1.5)).unwrap().to_american(), Some(-200));
        assert_eq!(Odds::new(dec!(1.0)).unwrap().to_american(), None);
    }

    #[test]
    fn american_round_trip() {
        for a in [-500, -200, -110, 100, 150, 300, 1000] {
            let odds = Odds::from_american(a).unwrap();
            assert_eq!(odds.to_american(), Some(a), "round trip failed for {a}");
        }
    }

    #[test]
    fn american_rejects_dead_zone() {
        assert!(Odds::from_american(0).is_none());
        assert!(Odds::from_american(50).is_none());
        assert!(Odds::from_american(-99).is_none());
    }
}
