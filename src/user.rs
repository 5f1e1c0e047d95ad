// 11.0 user.rs: user profile + rolling statistics. the stats exist to drive
// tier classification; updates are append-only. rolling-window resets belong
// to an external scheduler.

use crate::commission::CommissionTier;
use crate::types::{CurrencyCode, LiquidityRole, Timestamp, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserStatistics {
    pub total_volume: Decimal,
    pub thirty_day_volume: Decimal,
    pub seven_day_volume: Decimal,
    pub maker_trades: u64,
    pub taker_trades: u64,
    pub maker_volume: Decimal,
    pub taker_volume: Decimal,
    pub commission_paid: Decimal,
    /// Signed lifetime profit across settled matches
    pub net_profit: Decimal,
}

impl UserStatistics {
    /// Record a matched trade in every volume window.
    pub fn record_trade(&mut self, role: LiquidityRole, stake: Decimal) {
        self.total_volume += stake;
        self.thirty_day_volume += stake;
        self.seven_day_volume += stake;
        match role {
            LiquidityRole::Maker => {
                self.maker_trades += 1;
                self.maker_volume += stake;
            }
            LiquidityRole::Taker => {
                self.taker_trades += 1;
                self.taker_volume += stake;
            }
        }
    }

    pub fn record_commission(&mut self, amount: Decimal) {
        self.commission_paid += amount;
    }

    pub fn record_profit(&mut self, delta: Decimal) {
        self.net_profit += delta;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub currency: CurrencyCode,
    pub tier: CommissionTier,
    pub statistics: UserStatistics,
    pub created_at: Timestamp,
}

impl UserProfile {
    pub fn new(
        id: UserId,
        name: impl Into<String>,
        currency: CurrencyCode,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            currency,
            tier: CommissionTier::Standard,
            statistics: UserStatistics::default(),
            created_at,
        }
    }
}
