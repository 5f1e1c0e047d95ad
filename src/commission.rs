// 10.0 commission.rs: tiered commission pricing. the winner of an exchange
// match pays a rate set by their 30-day-volume tier, discounted when they
// provided the liquidity (maker). losers never pay.

use crate::money::{Money, MoneyError};
use crate::types::LiquidityRole;
use crate::user::UserProfile;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Volume tiers, ascending. Higher tiers pay lower rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CommissionTier {
    Standard,
    Bronze,
    Silver,
    Gold,
    Platinum,
}

/// One rung of the schedule: the minimum 30-day volume to qualify and the
/// base (taker) rate charged at that rung.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierLevel {
    pub tier: CommissionTier,
    pub min_thirty_day_volume: Decimal,
    pub base_rate: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommissionSchedule {
    /// Ascending by volume threshold; first entry is the floor tier.
    pub levels: Vec<TierLevel>,
    /// Fraction knocked off the base rate for makers (0.20 = 20% off)
    pub maker_discount: Decimal,
    /// Positive commissions below this are floored up to it
    pub minimum_commission: Decimal,
}

impl Default for CommissionSchedule {
    fn default() -> Self {
        Self {
            levels: vec![
                TierLevel {
                    tier: CommissionTier::Standard,
                    min_thirty_day_volume: Decimal::ZERO,
                    base_rate: dec!(0.015),
                },
                TierLevel {
                    tier: CommissionTier::Bronze,
                    min_thirty_day_volume: dec!(10_000),
                    base_rate: dec!(0.0125),
                },
                TierLevel {
                    tier: CommissionTier::Silver,
                    min_thirty_day_volume: dec!(100_000),
                    base_rate: dec!(0.010),
                },
                TierLevel {
                    tier: CommissionTier::Gold,
                    min_thirty_day_volume: dec!(500_000),
                    base_rate: dec!(0.0075),
                },
                TierLevel {
                    tier: CommissionTier::Platinum,
                    min_thirty_day_volume: dec!(1_000_000),
                    base_rate: dec!(0.005),
                },
            ],
            maker_discount: dec!(0.20),
            minimum_commission: dec!(0.01),
        }
    }
}

impl CommissionSchedule {
    /// Internal-consistency check: thresholds strictly ascending, rates
    /// strictly descending, discount a sane fraction.
    pub fn validate(&self) -> Result<(), CommissionError> {
        if self.levels.is_empty() {
            return Err(CommissionError::EmptySchedule);
        }
        for pair in self.levels.windows(2) {
            if pair[1].min_thirty_day_volume <= pair[0].min_thirty_day_volume {
                return Err(CommissionError::ThresholdsNotAscending);
            }
            if pair[1].base_rate >= pair[0].base_rate {
                return Err(CommissionError::RatesNotDescending);
            }
            if pair[1].tier <= pair[0].tier {
                return Err(CommissionError::TiersOutOfOrder);
            }
        }
        if self.maker_discount < Decimal::ZERO || self.maker_discount >= Decimal::ONE {
            return Err(CommissionError::InvalidMakerDiscount(self.maker_discount));
        }
        Ok(())
    }

    /// Map a 30-day volume onto a tier.
    pub fn calculate_tier(&self, thirty_day_volume: Decimal) -> CommissionTier {
        self.levels
            .iter()
            .rev()
            .find(|l| thirty_day_volume >= l.min_thirty_day_volume)
            .map(|l| l.tier)
            .unwrap_or(CommissionTier::Standard)
    }

    fn base_rate(&self, tier: CommissionTier) -> Decimal {
        self.levels
            .iter()
            .find(|l| l.tier == tier)
            .map(|l| l.base_rate)
            .unwrap_or(dec!(0.015))
    }

    /// Base rate for takers, discounted for makers.
    pub fn effective_rate(&self, tier: CommissionTier, role: LiquidityRole) -> Decimal {
        let base = self.base_rate(tier);
        match role {
            LiquidityRole::Taker => base,
            LiquidityRole::Maker => base * (Decimal::ONE - self.maker_discount),
        }
    }

    /// Price the commission on gross winnings. Zero winnings cost nothing;
    /// anything positive is rounded to currency precision and floored up to
    /// the configured minimum.
    pub fn calculate_commission(
        &self,
        user: &UserProfile,
        gross_winnings: Money,
        role: LiquidityRole,
    ) -> Result<Money, MoneyError> {
        if gross_winnings.is_zero() {
            return Ok(Money::zero(gross_winnings.currency()));
        }

        let rate = self.effective_rate(user.tier, role);
        let commission = gross_winnings.mul(rate)?.rounded();

        if !commission.is_zero() && commission.amount() < self.minimum_commission {
            return Money::new(self.minimum_commission, gross_winnings.currency());
        }
        Ok(commission)
    }

    /// Recompute the user's tier from their current statistics. Returns true
    /// only if the tier actually changed.
    pub fn update_user_tier(&self, user: &mut UserProfile) -> bool {
        let tier = self.calculate_tier(user.statistics.thirty_day_volume);
        if tier != user.tier {
            user.tier = tier;
            true
        } else {
            false
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommissionError {
    #[error("Commission schedule has no levels")]
    EmptySchedule,

    #[error("Tier volume thresholds must be strictly ascending")]
    ThresholdsNotAscending,

    #[error("Tier base rates must be strictly descending")]
    RatesNotDescending,

    #[error("Tier levels out of order")]
    TiersOutOfOrder,

    #[error("Maker discount {0} must be in [0, 1)")]
    InvalidMakerDiscount(Decimal),
}
