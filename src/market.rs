//! Market and outcome state.
//!
//! A market belongs to an event and owns a set of outcomes. Markets move
//! Open -> Closed -> Settled; close is one-way except an explicit reopen,
//! which is blocked once the market has settled.

use crate::odds::Odds;
use crate::types::{EventId, MarketId, OutcomeId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Market status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketStatus {
    /// Accepting bets and exchange orders
    Open,
    /// No new bets; awaiting settlement
    Closed,
    /// Results recorded, terminal
    Settled,
}

/// Market type drives settlement dispatch. `Specials` markets have no
/// automatic settlement logic and are skipped by `settle_event`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketType {
    Moneyline,
    Spread,
    Totals,
    Specials,
}

/// Result of an outcome after settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomeResult {
    Pending,
    Winner,
    Loser,
    Void,
    Push,
}

impl OutcomeResult {
    pub fn is_resolved(&self) -> bool {
        !matches!(self, OutcomeResult::Pending)
    }
}

/// One selectable outcome within a market.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outcome {
    pub id: OutcomeId,
    /// Display name; moneyline settlement matches this against team names
    pub name: String,
    /// Current (live) odds. Bets snapshot these at placement; drift after
    /// that never affects a placed bet.
    pub current_odds: Odds,
    /// Signed handicap or totals line, when the market type carries one
    pub line: Option<Decimal>,
    pub result: OutcomeResult,
}

impl Outcome {
    pub fn new(id: OutcomeId, name: impl Into<String>, current_odds: Odds) -> Self {
        Self {
            id,
            name: name.into(),
            current_odds,
            line: None,
            result: OutcomeResult::Pending,
        }
    }

    pub fn with_line(mut self, line: Decimal) -> Self {
        self.line = Some(line);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Market {
    pub id: MarketId,
    pub event_id: EventId,
    pub name: String,
    pub market_type: MarketType,
    pub status: MarketStatus,
    pub outcomes: Vec<Outcome>,
}

impl Market {
    pub fn new(
        id: MarketId,
        event_id: EventId,
        name: impl Into<String>,
        market_type: MarketType,
        outcomes: Vec<Outcome>,
    ) -> Self {
        Self {
            id,
            event_id,
            name: name.into(),
            market_type,
            status: MarketStatus::Open,
            outcomes,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == MarketStatus::Open
    }

    pub fn is_settled(&self) -> bool {
        self.status == MarketStatus::Settled
    }

    pub fn outcome(&self, outcome_id: OutcomeId) -> Option<&Outcome> {
        self.outcomes.iter().find(|o| o.id == outcome_id)
    }

    pub fn close(&mut self) {
        if self.status == MarketStatus::Open {
            self.status = MarketStatus::Closed;
        }
    }

    pub fn reopen(&mut self) -> Result<(), MarketError> {
        match self.status {
            MarketStatus::Settled => Err(MarketError::AlreadySettled(self.id)),
            _ => {
                self.status = MarketStatus::Open;
                Ok(())
            }
        }
    }

    /// Record a settlement result on one outcome. Each outcome accepts a
    /// result exactly once.
    pub fn record_result(
        &mut self,
        outcome_id: OutcomeId,
        result: OutcomeResult,
    ) -> Result<(), MarketError> {
        let outcome = self
            .outcomes
            .iter_mut()
            .find(|o| o.id == outcome_id)
            .ok_or(MarketError::OutcomeNotFound(outcome_id))?;

        if outcome.result.is_resolved() {
            return Err(MarketError::ResultAlreadyRecorded(outcome_id));
        }

        outcome.result = result;
        Ok(())
    }

    /// Mark the market settled once all of its outcomes are resolved.
    pub fn mark_settled(&mut self) -> Result<(), MarketError> {
        if self.status == MarketStatus::Settled {
            return Err(MarketError::AlreadySettled(self.id));
        }
        self.status = MarketStatus::Settled;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MarketError {
    #[error("Market {0:?} not found")]
    MarketNotFound(MarketId),

    #[error("Market {0:?} is not open")]
    MarketClosed(MarketId),

    #[error("Market {0:?} is already settled")]
    AlreadySettled(MarketId),

    #[error("Outcome {0:?} not found")]
    OutcomeNotFound(OutcomeId),

    #[error("Outcome {0:?} already has a recorded result")]
    ResultAlreadyRecorded(OutcomeId),
}
