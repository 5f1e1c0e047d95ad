// 15.0 config.rs: all settings in one place. matching strategy, commission
// schedule, retry policy, stake limits.

use crate::allocation::MatchingStrategyKind;
use crate::commission::{CommissionError, CommissionSchedule};
use crate::ledger::RetryPolicy;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

// Complete configuration for the exchange core
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeConfig {
    // How incoming stake is allocated across resting orders
    pub matching: MatchingStrategyKind,
    // Tier thresholds, rates, maker discount, minimum commission
    pub commission: CommissionSchedule,
    // Bounded retry for optimistic ledger commits
    pub retry: RetryPolicy,
    // Smallest accepted stake for bets and orders
    pub min_stake: Decimal,
    // Largest accepted stake
    pub max_stake: Decimal,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            matching: MatchingStrategyKind::Fifo,
            commission: CommissionSchedule::default(),
            retry: RetryPolicy::default(),
            min_stake: dec!(1),
            max_stake: dec!(100_000),
        }
    }
}

impl ExchangeConfig {
    // Pro-rata matching, favoured by venues that want size rewarded over speed
    pub fn pro_rata() -> Self {
        Self {
            matching: MatchingStrategyKind::ProRata,
            ..Self::default()
        }
    }

    // Hybrid matching: 40% FIFO carve-out for the oldest order, rest pro-rata
    pub fn hybrid_liquidity() -> Self {
        Self {
            matching: MatchingStrategyKind::Hybrid {
                top_order_count: 1,
                top_allocation_percent: dec!(0.40),
            },
            ..Self::default()
        }
    }

    // Promotional preset: no minimum commission, free makers at every tier
    pub fn promotional() -> Self {
        let mut config = Self::default();
        config.commission.minimum_commission = Decimal::ZERO;
        config.commission.maker_discount = dec!(0.99);
        config
    }

    // Validate the configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.commission.validate().map_err(ConfigError::Commission)?;

        if let MatchingStrategyKind::Hybrid {
            top_order_count,
            top_allocation_percent,
        } = self.matching
        {
            if top_order_count == 0 {
                return Err(ConfigError::InvalidMatching {
                    reason: "Hybrid top order count must be at least 1".to_string(),
                });
            }
            if top_allocation_percent <= Decimal::ZERO || top_allocation_percent > Decimal::ONE {
                return Err(ConfigError::InvalidMatching {
                    reason: "Hybrid top allocation percent must be in (0, 1]".to_string(),
                });
            }
        }

        if self.retry.max_attempts == 0 {
            return Err(ConfigError::InvalidRetry {
                reason: "Need at least 1 commit attempt".to_string(),
            });
        }

        if self.min_stake <= Decimal::ZERO || self.min_stake >= self.max_stake {
            return Err(ConfigError::InvalidStakeLimits {
                min: self.min_stake,
                max: self.max_stake,
            });
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid commission schedule: {0}")]
    Commission(CommissionError),

    #[error("Invalid matching config: {reason}")]
    InvalidMatching { reason: String },

    #[error("Invalid retry config: {reason}")]
    InvalidRetry { reason: String },

    #[error("Invalid stake limits: min {min}, max {max}")]
    InvalidStakeLimits { min: Decimal, max: Decimal },
}
