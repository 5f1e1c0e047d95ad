//! Sportsbook bets and their settlement state machine.
//!
//! A bet locks its odds at placement: selections are immutable snapshots of
//! the outcome they reference, so later odds drift never changes the payout.
//! Status runs Pending -> { Won, Lost, Pushed, Void }, all terminal.

use crate::money::{Money, MoneyError};
use crate::odds::Odds;
use crate::types::{BetId, EventId, MarketId, OutcomeId, Timestamp, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BetType {
    Single,
    Parlay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BetStatus {
    Pending,
    Won,
    Lost,
    Pushed,
    Void,
}

impl BetStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, BetStatus::Pending)
    }
}

/// Per-leg result, set during settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionResult {
    Pending,
    Won,
    Lost,
    Pushed,
    Void,
}

/// Immutable snapshot of an outcome taken at bet placement, plus the mutable
/// per-leg result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetSelection {
    pub event_id: EventId,
    pub market_id: MarketId,
    pub outcome_id: OutcomeId,
    /// Odds locked at placement. Never updated.
    pub locked_odds: Odds,
    pub line: Option<Decimal>,
    pub result: SelectionResult,
}

impl BetSelection {
    pub fn new(
        event_id: EventId,
        market_id: MarketId,
        outcome_id: OutcomeId,
        locked_odds: Odds,
    ) -> Self {
        Self {
            event_id,
            market_id,
            outcome_id,
            locked_odds,
            line: None,
            result: SelectionResult::Pending,
        }
    }

    pub fn with_line(mut self, line: Decimal) -> Self {
        self.line = Some(line);
        self
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self.result, SelectionResult::Pending)
    }
}

/// Outcome of settling a bet: the terminal status plus what the wallet is owed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BetSettlement {
    pub bet_id: BetId,
    pub status: BetStatus,
    pub payout: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bet {
    pub id: BetId,
    pub user_id: UserId,
    pub bet_type: BetType,
    pub stake: Money,
    /// Product of the legs' locked odds (or the single leg's odds).
    pub combined_odds: Odds,
    pub selections: Vec<BetSelection>,
    pub status: BetStatus,
    /// stake * combined_odds, computed once at placement
    pub potential_payout: Money,
    pub placed_at: Timestamp,
}

impl Bet {
    pub fn single(
        id: BetId,
        user_id: UserId,
        stake: Money,
        selection: BetSelection,
        placed_at: Timestamp,
    ) -> Result<Self, BetError> {
        if stake.is_zero() {
            return Err(BetError::ZeroStake);
        }
        let combined_odds = selection.locked_odds;
        let potential_payout = combined_odds.payout(stake)?;
        Ok(Self {
            id,
            user_id,
            bet_type: BetType::Single,
            stake,
            combined_odds,
            selections: vec![selection],
            status: BetStatus::Pending,
            potential_payout,
            placed_at,
        })
    }

    pub fn parlay(
        id: BetId,
        user_id: UserId,
        stake: Money,
        selections: Vec<BetSelection>,
        placed_at: Timestamp,
    ) -> Result<Self, BetError> {
        if stake.is_zero() {
            return Err(BetError::ZeroStake);
        }
        if selections.len() < 2 {
            return Err(BetError::InsufficientLegs {
                got: selections.len(),
            });
        }
        let combined_odds = selections
            .iter()
            .skip(1)
            .fold(selections[0].locked_odds, |acc, s| acc.combine(s.locked_odds));
        let potential_payout = combined_odds.payout(stake)?;
        Ok(Self {
            id,
            user_id,
            bet_type: BetType::Parlay,
            stake,
            combined_odds,
            selections,
            status: BetStatus::Pending,
            potential_payout,
            placed_at,
        })
    }

    /// Record a leg's result during a settlement pass. Each leg resolves once.
    pub fn resolve_selection(
        &mut self,
        market_id: MarketId,
        outcome_id: OutcomeId,
        result: SelectionResult,
    ) -> Result<(), BetError> {
        let selection = self
            .selections
            .iter_mut()
            .find(|s| s.market_id == market_id && s.outcome_id == outcome_id)
            .ok_or(BetError::SelectionNotFound {
                bet_id: self.id,
                outcome_id,
            })?;

        if selection.is_resolved() {
            return Err(BetError::SelectionAlreadyResolved {
                bet_id: self.id,
                outcome_id,
            });
        }

        selection.result = result;
        Ok(())
    }

    pub fn all_selections_resolved(&self) -> bool {
        self.selections.iter().all(BetSelection::is_resolved)
    }

    /// Settle the bet once every leg has a result. Pending-only: settling a
    /// terminal bet is an error and leaves it untouched.
    pub fn settle(&mut self) -> Result<BetSettlement, BetError> {
        if self.status.is_terminal() {
            return Err(BetError::AlreadySettled {
                bet_id: self.id,
                status: self.status,
            });
        }
        if !self.all_selections_resolved() {
            return Err(BetError::UnresolvedSelections(self.id));
        }

        let (status, payout) = match self.bet_type {
            BetType::Single => self.settle_single()?,
            BetType::Parlay => self.settle_parlay()?,
        };

        self.status = status;
        Ok(BetSettlement {
            bet_id: self.id,
            status,
            payout,
        })
    }

    fn settle_single(&self) -> Result<(BetStatus, Money), BetError> {
        let refund = self.stake;
        let zero = Money::zero(self.stake.currency());
        Ok(match self.selections[0].result {
            SelectionResult::Void => (BetStatus::Void, refund),
            SelectionResult::Pushed => (BetStatus::Pushed, refund),
            SelectionResult::Won => (BetStatus::Won, self.potential_payout),
            SelectionResult::Lost => (BetStatus::Lost, zero),
            SelectionResult::Pending => return Err(BetError::UnresolvedSelections(self.id)),
        })
    }

    /// Parlay settlement with leg-voiding recalculation: a lost leg loses the
    /// whole bet, dropped (void/pushed) legs shrink the combined odds to the
    /// product of the remaining won legs.
    fn settle_parlay(&self) -> Result<(BetStatus, Money), BetError> {
        let mut won = 0usize;
        let mut lost = 0usize;
        let mut dropped = 0usize; // void or pushed

        for selection in &self.selections {
            match selection.result {
                SelectionResult::Won => won += 1,
                SelectionResult::Lost => lost += 1,
                SelectionResult::Void | SelectionResult::Pushed => dropped += 1,
                SelectionResult::Pending => return Err(BetError::UnresolvedSelections(self.id)),
            }
        }

        let refund = self.stake;
        let zero = Money::zero(self.stake.currency());

        if lost > 0 {
            return Ok((BetStatus::Lost, zero));
        }

        let all_void = self
            .selections
            .iter()
            .all(|s| s.result == SelectionResult::Void);
        if all_void {
            return Ok((BetStatus::Void, refund));
        }

        if dropped > 0 {
            if won == 0 {
                // every leg pushed/voided (mixed) -> stake back
                return Ok((BetStatus::Pushed, refund));
            }
            // recombine only the won legs' locked odds
            let reduced = self
                .selections
                .iter()
                .filter(|s| s.result == SelectionResult::Won)
                .map(|s| s.locked_odds)
                .reduce(|acc, o| acc.combine(o))
                .expect("won > 0 guarantees at least one leg");
            return Ok((BetStatus::Won, reduced.payout(self.stake)?));
        }

        if won == self.selections.len() {
            return Ok((BetStatus::Won, self.potential_payout));
        }

        Err(BetError::InconsistentParlayState(self.id))
    }

    /// Manually void the bet. Legal only while Pending; refunds the full stake
    /// and forces every leg to Void.
    pub fn void(&mut self) -> Result<BetSettlement, BetError> {
        if self.status.is_terminal() {
            return Err(BetError::AlreadySettled {
                bet_id: self.id,
                status: self.status,
            });
        }
        for selection in &mut self.selections {
            selection.result = SelectionResult::Void;
        }
        self.status = BetStatus::Void;
        Ok(BetSettlement {
            bet_id: self.id,
            status: BetStatus::Void,
            payout: self.stake,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BetError {
    #[error("Stake must be positive")]
    ZeroStake,

    #[error("Parlay requires at least 2 legs, got {got}")]
    InsufficientLegs { got: usize },

    #[error("Bet {bet_id:?} has no selection for outcome {outcome_id:?}")]
    SelectionNotFound {
        bet_id: BetId,
        outcome_id: OutcomeId,
    },

    #[error("Bet {bet_id:?}: selection {outcome_id:?} already resolved")]
    SelectionAlreadyResolved {
        bet_id: BetId,
        outcome_id: OutcomeId,
    },

    #[error("Bet {bet_id:?} already settled as {status:?}")]
    AlreadySettled { bet_id: BetId, status: BetStatus },

    #[error("Bet {0:?} has unresolved selections")]
    UnresolvedSelections(BetId),

    #[error("Bet {0:?}: inconsistent parlay leg states")]
    InconsistentParlayState(BetId),

    #[error(transparent)]
    Money(#[from] MoneyError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CurrencyCode;
    use rust_decimal_macros::dec;

    fn usd(amount: Decimal) -> Money {
        Money::new(amount, CurrencyCode::Usd).unwrap()
    }

    fn selection(outcome: u32, odds: Decimal) -> BetSelection {
        BetSelection::new(
            EventId(1),
            MarketId(outcome),
            OutcomeId(outcome),
            Odds::new_unchecked(odds),
        )
    }

    fn two_leg_parlay(stake: Decimal) -> Bet {
        Bet::parlay(
            BetId(1),
            UserId(1),
            usd(stake),
            vec![selection(1, dec!(2.0)), selection(2, dec!(1.8))],
            Timestamp::from_millis(0),
        )
        .unwrap()
    }

    #[test]
    fn parlay_combined_odds() {
        let bet = two_leg_parlay(dec!(100));
        assert_eq!(bet.combined_odds.value(), dec!(3.6));
        assert_eq!(bet.potential_payout.amount(), dec!(360));
    }

    #[test]
    fn parlay_needs_two_legs() {
        let result = Bet::parlay(
            BetId(1),
            UserId(1),
            usd(dec!(100)),
            vec![selection(1, dec!(2.0))],
            Timestamp::from_millis(0),
        );
        assert!(matches!(result, Err(BetError::InsufficientLegs { got: 1 })));
    }

    #[test]
    fn single_win() {
        let mut bet = Bet::single(
            BetId(1),
            UserId(1),
            usd(dec!(50)),
            selection(1, dec!(2.4)),
            Timestamp::from_millis(0),
        )
        .unwrap();

        bet.resolve_selection(MarketId(1), OutcomeId(1), SelectionResult::Won)
            .unwrap();
        let settlement = bet.settle().unwrap();

        assert_eq!(settlement.status, BetStatus::Won);
        assert_eq!(settlement.payout.amount(), dec!(120));
    }

    #[test]
    fn single_push_refunds_stake() {
        let mut bet = Bet::single(
            BetId(1),
            UserId(1),
            usd(dec!(50)),
            selection(1, dec!(1.9)),
            Timestamp::from_millis(0),
        )
        .unwrap();

        bet.resolve_selection(MarketId(1), OutcomeId(1), SelectionResult::Pushed)
            .unwrap();
        let settlement = bet.settle().unwrap();

        assert_eq!(settlement.status, BetStatus::Pushed);
        assert_eq!(settlement.payout.amount(), dec!(50));
    }

    #[test]
    fn parlay_reduction_on_void_leg() {
        // 2.0 x 1.8 at $100; leg 2 voided, leg 1 wins -> $200, not $360
        let mut bet = two_leg_parlay(dec!(100));
        bet.resolve_selection(MarketId(1), OutcomeId(1), SelectionResult::Won)
            .unwrap();
        bet.resolve_selection(MarketId(2), OutcomeId(2), SelectionResult::Void)
            .unwrap();

        let settlement = bet.settle().unwrap();
        assert_eq!(settlement.status, BetStatus::Won);
        assert_eq!(settlement.payout.amount(), dec!(200));
    }

    #[test]
    fn parlay_lost_leg_loses_everything() {
        let mut bet = two_leg_parlay(dec!(100));
        bet.resolve_selection(MarketId(1), OutcomeId(1), SelectionResult::Won)
            .unwrap();
        bet.resolve_selection(MarketId(2), OutcomeId(2), SelectionResult::Lost)
            .unwrap();

        let settlement = bet.settle().unwrap();
        assert_eq!(settlement.status, BetStatus::Lost);
        assert!(settlement.payout.is_zero());
    }

    #[test]
    fn parlay_all_void() {
        let mut bet = two_leg_parlay(dec!(100));
        bet.resolve_selection(MarketId(1), OutcomeId(1), SelectionResult::Void)
            .unwrap();
        bet.resolve_selection(MarketId(2), OutcomeId(2), SelectionResult::Void)
            .unwrap();

        let settlement = bet.settle().unwrap();
        assert_eq!(settlement.status, BetStatus::Void);
        assert_eq!(settlement.payout.amount(), dec!(100));
    }

    #[test]
    fn parlay_all_pushed_refunds() {
        let mut bet = two_leg_parlay(dec!(100));
        bet.resolve_selection(MarketId(1), OutcomeId(1), SelectionResult::Pushed)
            .unwrap();
        bet.resolve_selection(MarketId(2), OutcomeId(2), SelectionResult::Void)
            .unwrap();

        let settlement = bet.settle().unwrap();
        assert_eq!(settlement.status, BetStatus::Pushed);
        assert_eq!(settlement.payout.amount(), dec!(100));
    }

    #[test]
    fn three_leg_parlay_two_wins_one_push() {
        let mut bet = Bet::parlay(
            BetId(1),
            UserId(1),
            usd(dec!(10)),
            vec![
                selection(1, dec!(2.0)),
                selection(2, dec!(1.5)),
                selection(3, dec!(3.0)),
            ],
            Timestamp::from_millis(0),
        )
        .unwrap();

        bet.resolve_selection(MarketId(1), OutcomeId(1), SelectionResult::Won)
            .unwrap();
        bet.resolve_selection(MarketId(2), OutcomeId(2), SelectionResult::Pushed)
            .unwrap();
        bet.resolve_selection(MarketId(3), OutcomeId(3), SelectionResult::Won)
            .unwrap();

        let settlement = bet.settle().unwrap();
        assert_eq!(settlement.status, BetStatus::Won);
        // 2.0 * 3.0 = 6.0 reduced odds
        assert_eq!(settlement.payout.amount(), dec!(60));
    }

    #[test]
    fn settle_twice_fails_and_preserves_state() {
        let mut bet = two_leg_parlay(dec!(100));
        bet.resolve_selection(MarketId(1), OutcomeId(1), SelectionResult::Won)
            .unwrap();
        bet.resolve_selection(MarketId(2), OutcomeId(2), SelectionResult::Won)
            .unwrap();
        bet.settle().unwrap();

        let second = bet.settle();
        assert!(matches!(second, Err(BetError::AlreadySettled { .. })));
        assert_eq!(bet.status, BetStatus::Won);
    }

    #[test]
    fn settle_with_pending_leg_fails() {
        let mut bet = two_leg_parlay(dec!(100));
        bet.resolve_selection(MarketId(1), OutcomeId(1), SelectionResult::Won)
            .unwrap();

        let result = bet.settle();
        assert!(matches!(result, Err(BetError::UnresolvedSelections(_))));
        assert_eq!(bet.status, BetStatus::Pending);
    }

    #[test]
    fn resolve_leg_twice_fails() {
        let mut bet = two_leg_parlay(dec!(100));
        bet.resolve_selection(MarketId(1), OutcomeId(1), SelectionResult::Won)
            .unwrap();
        let second = bet.resolve_selection(MarketId(1), OutcomeId(1), SelectionResult::Lost);
        assert!(matches!(second, Err(BetError::SelectionAlreadyResolved { .. })));
    }

    #[test]
    fn manual_void_refunds_and_forces_legs() {
        let mut bet = two_leg_parlay(dec!(100));
        bet.resolve_selection(MarketId(1), OutcomeId(1), SelectionResult::Won)
            .unwrap();

        let settlement = bet.void().unwrap();
        assert_eq!(settlement.status, BetStatus::Void);
        assert_eq!(settlement.payout.amount(), dec!(100));
        assert!(bet
            .selections
            .iter()
            .all(|s| s.result == SelectionResult::Void));
    }

    #[test]
    fn manual_void_blocked_after_settlement() {
        let mut bet = two_leg_parlay(dec!(100));
        bet.resolve_selection(MarketId(1), OutcomeId(1), SelectionResult::Lost)
            .unwrap();
        bet.resolve_selection(MarketId(2), OutcomeId(2), SelectionResult::Won)
            .unwrap();
        bet.settle().unwrap();

        assert!(matches!(bet.void(), Err(BetError::AlreadySettled { .. })));
    }
}
