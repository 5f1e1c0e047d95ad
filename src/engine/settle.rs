//! Event completion and the settlement pipeline.
//!
//! Settlement flows outcome results downhill: a completed event settles its
//! markets, market results resolve bet selections and exchange matches, and
//! the resulting payouts are committed through the ledger.

use super::core::Engine;
use super::results::{EngineError, EventSettlementResult, MatchSettlementResult};
use crate::bet::{BetSettlement, BetStatus, SelectionResult};
use crate::event::{EventError, Score};
use crate::events::{
    AuditPayload, BetSettledEvent, BetVoidedEvent, CommissionChargedEvent, EventCancelledEvent,
    EventCompletedEvent, MarketSettledEvent, MatchSettledEvent, MatchVoidedEvent,
    OrderCancelledEvent,
};
use crate::market::{MarketError, OutcomeResult};
use crate::money::Money;
use crate::order::ExchangeBet;
use crate::settlement::{settler_for, SettlementError};
use crate::types::{BetId, EventId, MatchId, Side, UserId};
use rust_decimal::Decimal;

impl Engine {
    /// Complete an event with its final score and force-close every market.
    pub fn complete_event(&mut self, event_id: EventId, score: Score) -> Result<(), EngineError> {
        let event = self
            .events
            .get_mut(&event_id)
            .ok_or(EventError::EventNotFound(event_id))?;
        event.complete(score)?;

        for market in self.markets.values_mut().filter(|m| m.event_id == event_id) {
            market.close();
        }

        self.emit_audit(AuditPayload::EventCompleted(EventCompletedEvent {
            event_id,
            home_score: score.home,
            away_score: score.away,
        }));
        Ok(())
    }

    /// Cancel an event before completion. Markets force-close without a
    /// score; bets on them void through `settle_bet`.
    pub fn cancel_event(&mut self, event_id: EventId) -> Result<(), EngineError> {
        let event = self
            .events
            .get_mut(&event_id)
            .ok_or(EventError::EventNotFound(event_id))?;
        event.cancel()?;

        for market in self.markets.values_mut().filter(|m| m.event_id == event_id) {
            market.close();
        }

        self.emit_audit(AuditPayload::EventCancelled(EventCancelledEvent {
            event_id,
        }));
        Ok(())
    }

    /// Settle every unsettled market of a completed event. Markets without a
    /// settlement rule are skipped, untouched. Resting orders on settled
    /// outcomes are cancelled and refunded.
    pub fn settle_event(&mut self, event_id: EventId) -> Result<EventSettlementResult, EngineError> {
        let event = self
            .events
            .get(&event_id)
            .cloned()
            .ok_or(EventError::EventNotFound(event_id))?;
        let score = event
            .final_score
            .ok_or(SettlementError::MissingScore(event_id))?;

        let market_ids: Vec<_> = self
            .markets
            .values()
            .filter(|m| m.event_id == event_id && !m.is_settled())
            .map(|m| m.id)
            .collect();

        let mut result = EventSettlementResult::default();
        for market_id in market_ids {
            let market = self
                .markets
                .get(&market_id)
                .ok_or(MarketError::MarketNotFound(market_id))?;

            let Some(settler) = settler_for(market.market_type) else {
                result.skipped_markets.push(market_id);
                continue;
            };
            let updates = settler(&event, market, score)?;

            let market = self
                .markets
                .get_mut(&market_id)
                .ok_or(MarketError::MarketNotFound(market_id))?;
            for (outcome_id, outcome_result) in &updates {
                market.record_result(*outcome_id, *outcome_result)?;
            }
            market.mark_settled()?;
            let outcome_ids: Vec<_> = market.outcomes.iter().map(|o| o.id).collect();

            for outcome_id in outcome_ids {
                result.cancelled_orders += self.cancel_resting_orders(outcome_id)?;
            }

            self.emit_audit(AuditPayload::MarketSettled(MarketSettledEvent {
                market_id,
                results: updates,
            }));
            result.settled_markets.push(market_id);
        }

        Ok(result)
    }

    /// Cancel all still-active orders on an outcome and refund their
    /// unmatched reservations. Used once a market settles.
    fn cancel_resting_orders(&mut self, outcome_id: crate::types::OutcomeId) -> Result<usize, EngineError> {
        let mut cancelled = Vec::new();
        if let Some(book) = self.books.get_mut(&outcome_id) {
            for order_id in book.active_order_ids() {
                let order = book
                    .get_mut(order_id)
                    .ok_or(crate::order::OrderError::OrderNotFound(order_id))?;
                let released = order.cancel()?;
                let refund = ExchangeBet::liability_of(order.side, order.proposed_odds, released)?;
                cancelled.push((order_id, order.user_id, released, refund));
            }
        }

        let retry = self.config.exchange.retry;
        let count = cancelled.len();
        for (order_id, user_id, released, refund) in cancelled {
            if !refund.is_zero() {
                self.wallets
                    .update(user_id, retry, |w| w.release_reservation(refund))?;
            }
            self.emit_audit(AuditPayload::OrderCancelled(OrderCancelledEvent {
                order_id,
                user_id,
                released_stake: released,
            }));
        }
        Ok(count)
    }

    /// Settle a sportsbook bet: resolve each leg against its market (legs on
    /// cancelled events void), run the bet's settlement, and pay the wallet.
    pub fn settle_bet(&mut self, bet_id: BetId) -> Result<BetSettlement, EngineError> {
        let bet = self
            .bets
            .get(&bet_id)
            .ok_or(EngineError::BetNotFound(bet_id))?;

        // resolve pending legs from market results before touching the bet
        let mut resolutions = Vec::new();
        for selection in bet.selections.iter().filter(|s| !s.is_resolved()) {
            let event = self
                .events
                .get(&selection.event_id)
                .ok_or(EventError::EventNotFound(selection.event_id))?;
            let leg_result = if event.status == crate::event::EventStatus::Cancelled {
                SelectionResult::Void
            } else {
                let market = self
                    .markets
                    .get(&selection.market_id)
                    .ok_or(MarketError::MarketNotFound(selection.market_id))?;
                let outcome = market
                    .outcome(selection.outcome_id)
                    .ok_or(MarketError::OutcomeNotFound(selection.outcome_id))?;
                match outcome.result {
                    OutcomeResult::Winner => SelectionResult::Won,
                    OutcomeResult::Loser => SelectionResult::Lost,
                    OutcomeResult::Void => SelectionResult::Void,
                    OutcomeResult::Push => SelectionResult::Pushed,
                    OutcomeResult::Pending => {
                        return Err(SettlementError::OutcomeUnresolved(selection.outcome_id).into())
                    }
                }
            };
            resolutions.push((selection.market_id, selection.outcome_id, leg_result));
        }

        let bet = self
            .bets
            .get_mut(&bet_id)
            .ok_or(EngineError::BetNotFound(bet_id))?;
        for (market_id, outcome_id, leg_result) in resolutions {
            bet.resolve_selection(market_id, outcome_id, leg_result)?;
        }

        let settlement = bet.settle()?;
        let user_id = bet.user_id;
        self.pay_bet_settlement(user_id, &settlement)?;

        self.emit_audit(AuditPayload::BetSettled(BetSettledEvent {
            bet_id,
            user_id,
            status: settlement.status,
            payout: settlement.payout,
        }));
        Ok(settlement)
    }

    /// Manually void a pending bet: full stake refund, all legs forced Void.
    pub fn void_bet(&mut self, bet_id: BetId) -> Result<BetSettlement, EngineError> {
        let bet = self
            .bets
            .get_mut(&bet_id)
            .ok_or(EngineError::BetNotFound(bet_id))?;
        let settlement = bet.void()?;
        let user_id = bet.user_id;

        let retry = self.config.exchange.retry;
        let refund = settlement.payout;
        self.wallets
            .update(user_id, retry, |w| w.release_reservation(refund))?;

        self.emit_audit(AuditPayload::BetVoided(BetVoidedEvent {
            bet_id,
            user_id,
            refund,
        }));
        Ok(settlement)
    }

    fn pay_bet_settlement(
        &mut self,
        user_id: UserId,
        settlement: &BetSettlement,
    ) -> Result<(), EngineError> {
        let retry = self.config.exchange.retry;
        let payout = settlement.payout;
        match settlement.status {
            BetStatus::Won => {
                self.wallets
                    .update(user_id, retry, |w| w.credit_payout(payout))?;
            }
            // refunds are returned reservations, not winnings
            BetStatus::Pushed | BetStatus::Void => {
                self.wallets
                    .update(user_id, retry, |w| w.release_reservation(payout))?;
            }
            BetStatus::Lost | BetStatus::Pending => {}
        }
        Ok(())
    }

    /// Settle one exchange match against its resolved outcome. The winner
    /// pays commission priced by their tier and liquidity role; the loser
    /// pays nothing. A voided outcome returns both sides' stakes.
    pub fn settle_exchange_match(
        &mut self,
        match_id: MatchId,
    ) -> Result<MatchSettlementResult, EngineError> {
        let bet_match = self
            .matches
            .get(&match_id)
            .ok_or(EngineError::MatchNotFound(match_id))?;
        if bet_match.settled {
            return Err(crate::order::OrderError::MatchAlreadySettled(match_id).into());
        }

        let market = self
            .markets
            .get(&bet_match.market_id)
            .ok_or(MarketError::MarketNotFound(bet_match.market_id))?;
        let outcome = market
            .outcome(bet_match.outcome_id)
            .ok_or(MarketError::OutcomeNotFound(bet_match.outcome_id))?;

        match outcome.result {
            OutcomeResult::Winner => self.settle_match_won(match_id, Side::Back),
            OutcomeResult::Loser => self.settle_match_won(match_id, Side::Lay),
            OutcomeResult::Void | OutcomeResult::Push => self.settle_match_voided(match_id),
            OutcomeResult::Pending => {
                Err(SettlementError::OutcomeUnresolved(bet_match.outcome_id).into())
            }
        }
    }

    fn settle_match_won(
        &mut self,
        match_id: MatchId,
        winning_side: Side,
    ) -> Result<MatchSettlementResult, EngineError> {
        let bet_match = self
            .matches
            .get(&match_id)
            .ok_or(EngineError::MatchNotFound(match_id))?;

        let (winner_bet_id, winner_user_id, loser_user_id) = match winning_side {
            Side::Back => (
                bet_match.back_bet_id,
                bet_match.back_user_id,
                bet_match.lay_user_id,
            ),
            Side::Lay => (
                bet_match.lay_bet_id,
                bet_match.lay_user_id,
                bet_match.back_user_id,
            ),
        };

        let gross = bet_match.gross_winnings()?;
        let winner_role = bet_match.role_of(winner_bet_id)?;
        let matched_stake = bet_match.matched_stake;

        let schedule = &self.config.exchange.commission;
        let winner = self
            .users
            .get(&winner_user_id)
            .ok_or(EngineError::UserNotFound(winner_user_id))?;
        let rate = schedule.effective_rate(winner.tier, winner_role);
        let commission = schedule.calculate_commission(winner, gross, winner_role)?;

        let net = gross.sub(commission)?;
        let payout = matched_stake.add(net)?;

        // the exactly-once guard: transition the match before paying out
        self.matches
            .get_mut(&match_id)
            .ok_or(EngineError::MatchNotFound(match_id))?
            .mark_settled(winner_bet_id, winner_role)?;

        let retry = self.config.exchange.retry;
        self.wallets
            .update(winner_user_id, retry, |w| w.credit_payout(payout))?;

        if let Some(winner) = self.users.get_mut(&winner_user_id) {
            winner.statistics.record_commission(commission.amount());
            winner.statistics.record_profit(net.amount());
        }
        if let Some(loser) = self.users.get_mut(&loser_user_id) {
            loser.statistics.record_profit(-matched_stake.amount());
        }

        if !commission.is_zero() {
            self.emit_audit(AuditPayload::CommissionCharged(CommissionChargedEvent {
                user_id: winner_user_id,
                match_id,
                role: winner_role,
                rate,
                amount: commission,
            }));
        }
        self.emit_audit(AuditPayload::MatchSettled(MatchSettledEvent {
            match_id,
            winning_bet_id: winner_bet_id,
            winner_role,
            gross_winnings: gross,
            commission,
            payout,
        }));

        Ok(MatchSettlementResult {
            match_id,
            winning_bet_id: Some(winner_bet_id),
            winner_role: Some(winner_role),
            gross_winnings: gross,
            commission,
            payout,
        })
    }

    fn settle_match_voided(
        &mut self,
        match_id: MatchId,
    ) -> Result<MatchSettlementResult, EngineError> {
        let bet_match = self
            .matches
            .get_mut(&match_id)
            .ok_or(EngineError::MatchNotFound(match_id))?;
        bet_match.mark_voided()?;

        let back_user_id = bet_match.back_user_id;
        let lay_user_id = bet_match.lay_user_id;
        let back_refund = bet_match.matched_stake;
        let lay_refund = bet_match
            .matched_stake
            .mul(bet_match.matched_odds.value() - Decimal::ONE)?
            .rounded();
        let currency = back_refund.currency();

        let retry = self.config.exchange.retry;
        self.wallets
            .update(back_user_id, retry, |w| w.release_reservation(back_refund))?;
        if !lay_refund.is_zero() {
            self.wallets
                .update(lay_user_id, retry, |w| w.release_reservation(lay_refund))?;
        }

        self.emit_audit(AuditPayload::MatchVoided(MatchVoidedEvent {
            match_id,
            back_refund,
            lay_refund,
        }));

        Ok(MatchSettlementResult {
            match_id,
            winning_bet_id: None,
            winner_role: None,
            gross_winnings: Money::zero(currency),
            commission: Money::zero(currency),
            payout: Money::zero(currency),
        })
    }

    /// Commission preview for a hypothetical win, using the user's current
    /// tier and the given role.
    pub fn calculate_commission(
        &self,
        user_id: UserId,
        gross_winnings: Money,
        role: crate::types::LiquidityRole,
    ) -> Result<Money, EngineError> {
        let user = self
            .users
            .get(&user_id)
            .ok_or(EngineError::UserNotFound(user_id))?;
        Ok(self
            .config
            .exchange
            .commission
            .calculate_commission(user, gross_winnings, role)?)
    }
}
