//! Bet and order placement, matching, and cancellation.

use super::core::Engine;
use super::results::{EngineError, MatchResult};
use crate::bet::{Bet, BetSelection};
use crate::events::{
    AuditPayload, BetPlacedEvent, OrderCancelledEvent, OrderMatchedEvent, OrderPlacedEvent,
};
use crate::market::MarketError;
use crate::money::{Money, MoneyError};
use crate::odds::Odds;
use crate::order::{BetMatch, ExchangeBet, OrderError};
use crate::types::{BetId, LiquidityRole, MarketId, MatchId, OrderId, OutcomeId, Side, UserId};
use rust_decimal::Decimal;

impl Engine {
    fn validate_stake(&self, user_id: UserId, stake: Money) -> Result<(), EngineError> {
        let user = self
            .users
            .get(&user_id)
            .ok_or(EngineError::UserNotFound(user_id))?;
        if user.currency != stake.currency() {
            return Err(MoneyError::CurrencyMismatch {
                left: user.currency,
                right: stake.currency(),
            }
            .into());
        }
        let limits = &self.config.exchange;
        if stake.amount() < limits.min_stake || stake.amount() > limits.max_stake {
            return Err(EngineError::StakeOutOfRange {
                stake: stake.amount(),
                min: limits.min_stake,
                max: limits.max_stake,
            });
        }
        Ok(())
    }

    /// Snapshot one outcome of an open market for a bet selection.
    fn snapshot_selection(
        &self,
        market_id: MarketId,
        outcome_id: OutcomeId,
    ) -> Result<BetSelection, EngineError> {
        let market = self
            .markets
            .get(&market_id)
            .ok_or(MarketError::MarketNotFound(market_id))?;
        if !market.is_open() {
            return Err(MarketError::MarketClosed(market_id).into());
        }
        let outcome = market
            .outcome(outcome_id)
            .ok_or(MarketError::OutcomeNotFound(outcome_id))?;

        let mut selection = BetSelection::new(
            market.event_id,
            market_id,
            outcome_id,
            outcome.current_odds,
        );
        if let Some(line) = outcome.line {
            selection = selection.with_line(line);
        }
        Ok(selection)
    }

    /// Place a single sportsbook bet at the outcome's current odds.
    pub fn place_single_bet(
        &mut self,
        user_id: UserId,
        market_id: MarketId,
        outcome_id: OutcomeId,
        stake: Money,
    ) -> Result<BetId, EngineError> {
        self.validate_stake(user_id, stake)?;
        let selection = self.snapshot_selection(market_id, outcome_id)?;
        let bet = Bet::single(self.next_bet_id(), user_id, stake, selection, self.current_time)?;
        self.commit_bet(bet)
    }

    /// Place a parlay across several outcomes; combined odds are the product
    /// of the locked leg odds.
    pub fn place_parlay_bet(
        &mut self,
        user_id: UserId,
        legs: &[(MarketId, OutcomeId)],
        stake: Money,
    ) -> Result<BetId, EngineError> {
        self.validate_stake(user_id, stake)?;
        let selections = legs
            .iter()
            .map(|(m, o)| self.snapshot_selection(*m, *o))
            .collect::<Result<Vec<_>, _>>()?;
        let bet = Bet::parlay(self.next_bet_id(), user_id, stake, selections, self.current_time)?;
        self.commit_bet(bet)
    }

    fn commit_bet(&mut self, bet: Bet) -> Result<BetId, EngineError> {
        let retry = self.config.exchange.retry;
        let stake = bet.stake;
        self.wallets
            .update(bet.user_id, retry, |w| w.debit_stake(stake))?;

        let bet_id = bet.id;
        self.emit_audit(AuditPayload::BetPlaced(BetPlacedEvent {
            bet_id,
            user_id: bet.user_id,
            stake: bet.stake,
            combined_odds: bet.combined_odds,
            leg_count: bet.selections.len(),
        }));
        self.bets.insert(bet_id, bet);
        Ok(bet_id)
    }

    /// Place an exchange order and match it against resting liquidity on the
    /// opposite side. Funds are reserved up front: the stake for Back orders,
    /// the liability for Lay orders.
    pub fn match_order(
        &mut self,
        user_id: UserId,
        market_id: MarketId,
        outcome_id: OutcomeId,
        side: Side,
        proposed_odds: Odds,
        stake: Money,
    ) -> Result<MatchResult, EngineError> {
        self.validate_stake(user_id, stake)?;

        let market = self
            .markets
            .get(&market_id)
            .ok_or(MarketError::MarketNotFound(market_id))?;
        if !market.is_open() {
            return Err(MarketError::MarketClosed(market_id).into());
        }
        market
            .outcome(outcome_id)
            .ok_or(MarketError::OutcomeNotFound(outcome_id))?;

        let order_id = self.next_order_id();
        let mut order = ExchangeBet::new(
            order_id,
            user_id,
            market_id,
            outcome_id,
            side,
            proposed_odds,
            stake,
            self.current_time,
        )?;

        let reservation = order.liability()?;
        if !reservation.is_zero() {
            let retry = self.config.exchange.retry;
            self.wallets
                .update(user_id, retry, |w| w.debit_stake(reservation))?;
        }

        self.emit_audit(AuditPayload::OrderPlaced(OrderPlacedEvent {
            order_id,
            user_id,
            outcome_id,
            side,
            proposed_odds,
            stake,
        }));

        // pure allocation over a snapshot of compatible resting orders, then
        // the whole batch of effects is applied in one pass
        let book = self.books.entry(outcome_id).or_default();
        let candidates = book.candidates(side, proposed_odds);
        let allocations = self.strategy.allocate(stake.amount(), &candidates);

        let currency = stake.currency();
        let mut match_ids = Vec::with_capacity(allocations.len());
        let mut matched_total = Decimal::ZERO;
        for allocation in allocations {
            let amount = Money::new(allocation.amount, currency)?;
            let match_id = self.execute_match(&mut order, allocation.order_id, amount)?;
            match_ids.push(match_id);
            matched_total += allocation.amount;
        }

        let matched_amount = Money::new(matched_total, currency)?;
        let unmatched_amount = order.unmatched_stake;
        self.order_index.insert(order_id, outcome_id);
        self.books.entry(outcome_id).or_default().insert(order);

        Ok(MatchResult {
            order_id,
            matches: match_ids,
            matched_amount,
            unmatched_amount,
        })
    }

    /// Take (part of) a specific resting order at its quoted odds.
    pub fn take_order(
        &mut self,
        order_id: OrderId,
        taker_user_id: UserId,
        stake_to_match: Money,
    ) -> Result<MatchResult, EngineError> {
        let outcome_id = *self
            .order_index
            .get(&order_id)
            .ok_or(OrderError::OrderNotFound(order_id))?;
        let resting = self
            .books
            .get(&outcome_id)
            .and_then(|b| b.get(order_id))
            .ok_or(OrderError::OrderNotFound(order_id))?;

        if resting.user_id == taker_user_id {
            return Err(EngineError::SelfMatch {
                order_id,
                owner: taker_user_id,
            });
        }
        if !resting.is_active() {
            return Err(OrderError::CannotMatch {
                order_id,
                state: resting.state,
            }
            .into());
        }

        let side = resting.side.opposite();
        let odds = resting.proposed_odds;
        let market_id = resting.market_id;

        self.validate_stake(taker_user_id, stake_to_match)?;
        if stake_to_match.amount() > resting.unmatched_stake.amount() {
            return Err(OrderError::ExceedsUnmatched {
                order_id,
                requested: stake_to_match.amount(),
                unmatched: resting.unmatched_stake.amount(),
            }
            .into());
        }

        let taker_order_id = self.next_order_id();
        let mut taker_order = ExchangeBet::new(
            taker_order_id,
            taker_user_id,
            market_id,
            outcome_id,
            side,
            odds,
            stake_to_match,
            self.current_time,
        )?;

        let reservation = taker_order.liability()?;
        if !reservation.is_zero() {
            let retry = self.config.exchange.retry;
            self.wallets
                .update(taker_user_id, retry, |w| w.debit_stake(reservation))?;
        }

        self.emit_audit(AuditPayload::OrderPlaced(OrderPlacedEvent {
            order_id: taker_order_id,
            user_id: taker_user_id,
            outcome_id,
            side,
            proposed_odds: odds,
            stake: stake_to_match,
        }));

        let match_id = self.execute_match(&mut taker_order, order_id, stake_to_match)?;

        self.order_index.insert(taker_order_id, outcome_id);
        self.books.entry(outcome_id).or_default().insert(taker_order);

        Ok(MatchResult {
            order_id: taker_order_id,
            matches: vec![match_id],
            matched_amount: stake_to_match,
            unmatched_amount: Money::zero(stake_to_match.currency()),
        })
    }

    /// Cancel a resting order, releasing the unmatched remainder back to the
    /// owner's wallet. The matched portion stands.
    pub fn cancel_order(
        &mut self,
        order_id: OrderId,
        requesting_user_id: UserId,
    ) -> Result<Money, EngineError> {
        let outcome_id = *self
            .order_index
            .get(&order_id)
            .ok_or(OrderError::OrderNotFound(order_id))?;
        let order = self
            .books
            .get_mut(&outcome_id)
            .and_then(|b| b.get_mut(order_id))
            .ok_or(OrderError::OrderNotFound(order_id))?;

        if order.user_id != requesting_user_id {
            return Err(EngineError::NotOrderOwner {
                order_id,
                user_id: requesting_user_id,
            });
        }

        let released = order.cancel()?;
        let refund = ExchangeBet::liability_of(order.side, order.proposed_odds, released)?;
        let owner = order.user_id;

        if !refund.is_zero() {
            let retry = self.config.exchange.retry;
            self.wallets
                .update(owner, retry, |w| w.release_reservation(refund))?;
        }

        self.emit_audit(AuditPayload::OrderCancelled(OrderCancelledEvent {
            order_id,
            user_id: owner,
            released_stake: released,
        }));

        Ok(released)
    }

    /// Apply one allocation: move stake on both orders, record the match, and
    /// update both users' rolling statistics. The resting order is always the
    /// maker and sets the matched odds.
    fn execute_match(
        &mut self,
        incoming: &mut ExchangeBet,
        resting_id: OrderId,
        amount: Money,
    ) -> Result<MatchId, EngineError> {
        let outcome_id = incoming.outcome_id;
        let book = self
            .books
            .get_mut(&outcome_id)
            .ok_or(OrderError::OrderNotFound(resting_id))?;
        let resting = book
            .get_mut(resting_id)
            .ok_or(OrderError::OrderNotFound(resting_id))?;

        let matched_odds = resting.proposed_odds;
        resting.apply_match(amount)?;
        incoming.apply_match(amount)?;
        let resting_snapshot = resting.clone();

        let (back, lay) = match incoming.side {
            Side::Back => (&*incoming, &resting_snapshot),
            Side::Lay => (&resting_snapshot, &*incoming),
        };

        let match_id = self.next_match_id();
        let bet_match = BetMatch::create(
            match_id,
            back,
            lay,
            amount,
            matched_odds,
            resting_id,
            self.current_time,
        )?;

        // an incoming lay reserved liability at its own odds; matching at
        // better (lower) maker odds frees the difference
        if incoming.side == Side::Lay && incoming.proposed_odds > matched_odds {
            let excess =
                amount.mul(incoming.proposed_odds.value() - matched_odds.value())?;
            if !excess.is_zero() {
                let retry = self.config.exchange.retry;
                let user_id = incoming.user_id;
                self.wallets
                    .update(user_id, retry, |w| w.release_reservation(excess))?;
            }
        }

        for (user_id, role) in [
            (resting_snapshot.user_id, LiquidityRole::Maker),
            (incoming.user_id, LiquidityRole::Taker),
        ] {
            if let Some(user) = self.users.get_mut(&user_id) {
                user.statistics.record_trade(role, amount.amount());
            }
        }

        self.emit_audit(AuditPayload::OrderMatched(OrderMatchedEvent {
            match_id,
            back_bet_id: bet_match.back_bet_id,
            lay_bet_id: bet_match.lay_bet_id,
            maker_bet_id: resting_id,
            matched_stake: amount,
            matched_odds,
        }));
        self.matches.insert(match_id, bet_match);

        Ok(match_id)
    }
}
