//! Exchange orders, the per-outcome order book, and match records.
//!
//! An `ExchangeBet` is a resting or incoming order on one side (Back/Lay) of
//! an outcome. Matching moves stake from unmatched to matched and produces
//! immutable `BetMatch` execution records pairing one Back and one Lay order.

use crate::money::{Money, MoneyError};
use crate::odds::Odds;
use crate::types::{LiquidityRole, MarketId, MatchId, OrderId, OutcomeId, Side, Timestamp, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Matching state. A pure function of unmatched stake and the cancel flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderState {
    Unmatched,
    PartiallyMatched,
    Matched,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeBet {
    pub id: OrderId,
    pub user_id: UserId,
    pub market_id: MarketId,
    pub outcome_id: OutcomeId,
    pub side: Side,
    pub proposed_odds: Odds,
    pub total_stake: Money,
    pub matched_stake: Money,
    pub unmatched_stake: Money,
    pub state: OrderState,
    cancelled: bool,
    /// FIFO tie-break key
    pub created_at: Timestamp,
}

impl ExchangeBet {
    pub fn new(
        id: OrderId,
        user_id: UserId,
        market_id: MarketId,
        outcome_id: OutcomeId,
        side: Side,
        proposed_odds: Odds,
        stake: Money,
        created_at: Timestamp,
    ) -> Result<Self, OrderError> {
        if stake.is_zero() {
            return Err(OrderError::ZeroStake(id));
        }
        Ok(Self {
            id,
            user_id,
            market_id,
            outcome_id,
            side,
            proposed_odds,
            total_stake: stake,
            matched_stake: Money::zero(stake.currency()),
            unmatched_stake: stake,
            state: OrderState::Unmatched,
            cancelled: false,
            created_at,
        })
    }

    fn recompute_state(&mut self) {
        self.state = if self.cancelled {
            OrderState::Cancelled
        } else if self.unmatched_stake.is_zero() {
            OrderState::Matched
        } else if self.matched_stake.is_zero() {
            OrderState::Unmatched
        } else {
            OrderState::PartiallyMatched
        };
    }

    pub fn is_active(&self) -> bool {
        !self.cancelled && !self.unmatched_stake.is_zero()
    }

    /// Stake still available to the matching engine. Zero once cancelled.
    pub fn available_stake(&self) -> Decimal {
        if self.is_active() {
            self.unmatched_stake.amount()
        } else {
            Decimal::ZERO
        }
    }

    /// Move stake from unmatched to matched. Requires 0 < amount <= unmatched.
    pub fn apply_match(&mut self, amount: Money) -> Result<(), OrderError> {
        if amount.is_zero() {
            return Err(OrderError::ZeroMatchAmount(self.id));
        }
        if self.cancelled {
            return Err(OrderError::CannotMatch {
                order_id: self.id,
                state: self.state,
            });
        }
        if amount.amount() > self.unmatched_stake.amount() {
            return Err(OrderError::ExceedsUnmatched {
                order_id: self.id,
                requested: amount.amount(),
                unmatched: self.unmatched_stake.amount(),
            });
        }
        self.unmatched_stake = self.unmatched_stake.sub(amount)?;
        self.matched_stake = self.matched_stake.add(amount)?;
        self.recompute_state();
        Ok(())
    }

    /// Cancel the order, releasing the unmatched remainder. The matched
    /// portion stands. Illegal once fully matched or already cancelled.
    pub fn cancel(&mut self) -> Result<Money, OrderError> {
        match self.state {
            OrderState::Matched | OrderState::Cancelled => Err(OrderError::CannotCancel {
                order_id: self.id,
                state: self.state,
            }),
            _ => {
                let released = self.unmatched_stake;
                self.cancelled = true;
                self.recompute_state();
                Ok(released)
            }
        }
    }

    /// Maximum loss this order can realize: Back risks the stake itself, Lay
    /// risks stake * (odds - 1).
    pub fn liability(&self) -> Result<Money, MoneyError> {
        Self::liability_of(self.side, self.proposed_odds, self.total_stake)
    }

    pub fn liability_of(side: Side, odds: Odds, stake: Money) -> Result<Money, MoneyError> {
        match side {
            Side::Back => Ok(stake),
            Side::Lay => stake.mul(odds.value() - Decimal::ONE),
        }
    }
}

/// Immutable execution record pairing one Back and one Lay order. Created once
/// per execution and mutated only by the single settlement transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetMatch {
    pub id: MatchId,
    pub market_id: MarketId,
    pub outcome_id: OutcomeId,
    pub back_bet_id: OrderId,
    pub back_user_id: UserId,
    pub lay_bet_id: OrderId,
    pub lay_user_id: UserId,
    pub matched_stake: Money,
    pub matched_odds: Odds,
    /// The order that was resting first and provided the liquidity.
    pub maker_bet_id: OrderId,
    pub settled: bool,
    pub winning_bet_id: Option<OrderId>,
    /// Which role paid commission, recorded at settlement
    pub commission_paid_by: Option<LiquidityRole>,
    pub created_at: Timestamp,
}

impl BetMatch {
    pub fn create(
        id: MatchId,
        back: &ExchangeBet,
        lay: &ExchangeBet,
        matched_stake: Money,
        matched_odds: Odds,
        maker_bet_id: OrderId,
        created_at: Timestamp,
    ) -> Result<Self, OrderError> {
        if back.side != Side::Back || lay.side != Side::Lay {
            return Err(OrderError::NotBackLayPair {
                first: back.side,
                second: lay.side,
            });
        }
        if matched_stake.is_zero() {
            return Err(OrderError::ZeroMatchAmount(back.id));
        }
        if maker_bet_id != back.id && maker_bet_id != lay.id {
            return Err(OrderError::MakerNotParticipant {
                match_id: id,
                maker_bet_id,
            });
        }
        Ok(Self {
            id,
            market_id: back.market_id,
            outcome_id: back.outcome_id,
            back_bet_id: back.id,
            back_user_id: back.user_id,
            lay_bet_id: lay.id,
            lay_user_id: lay.user_id,
            matched_stake,
            matched_odds,
            maker_bet_id,
            settled: false,
            winning_bet_id: None,
            commission_paid_by: None,
            created_at,
        })
    }

    pub fn taker_bet_id(&self) -> OrderId {
        if self.maker_bet_id == self.back_bet_id {
            self.lay_bet_id
        } else {
            self.back_bet_id
        }
    }

    /// Role of a participant, derived by comparing against the maker id.
    pub fn role_of(&self, bet_id: OrderId) -> Result<LiquidityRole, OrderError> {
        if bet_id == self.maker_bet_id {
            Ok(LiquidityRole::Maker)
        } else if bet_id == self.back_bet_id || bet_id == self.lay_bet_id {
            Ok(LiquidityRole::Taker)
        } else {
            Err(OrderError::UnknownMatchParticipant {
                match_id: self.id,
                bet_id,
            })
        }
    }

    /// What the winning side stands to gain: stake * (odds - 1).
    pub fn gross_winnings(&self) -> Result<Money, MoneyError> {
        self.matched_stake
            .mul(self.matched_odds.value() - Decimal::ONE)
            .map(|m| m.rounded())
    }

    /// The single settlement transition. Exactly once.
    pub fn mark_settled(
        &mut self,
        winning_bet_id: OrderId,
        commission_paid_by: LiquidityRole,
    ) -> Result<(), OrderError> {
        if self.settled {
            return Err(OrderError::MatchAlreadySettled(self.id));
        }
        if winning_bet_id != self.back_bet_id && winning_bet_id != self.lay_bet_id {
            return Err(OrderError::UnknownMatchParticipant {
                match_id: self.id,
                bet_id: winning_bet_id,
            });
        }
        self.settled = true;
        self.winning_bet_id = Some(winning_bet_id);
        self.commission_paid_by = Some(commission_paid_by);
        Ok(())
    }

    /// Void transition for matches whose deciding outcome voided or pushed:
    /// settled with no winner, both stakes returned by the engine.
    pub fn mark_voided(&mut self) -> Result<(), OrderError> {
        if self.settled {
            return Err(OrderError::MatchAlreadySettled(self.id));
        }
        self.settled = true;
        Ok(())
    }
}

/// Time-priority key for resting orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct TimeKey {
    created_at: Timestamp,
    order_id: OrderId,
}

impl TimeKey {
    fn of(order: &ExchangeBet) -> Self {
        Self {
            created_at: order.created_at,
            order_id: order.id,
        }
    }
}

/// Resting orders for a single outcome, both sides, in arrival order.
#[derive(Debug, Clone, Default)]
pub struct OrderBook {
    backs: BTreeMap<TimeKey, ExchangeBet>,
    lays: BTreeMap<TimeKey, ExchangeBet>,
    order_index: HashMap<OrderId, (Side, TimeKey)>,
}

impl OrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, order: ExchangeBet) {
        let key = TimeKey::of(&order);
        self.order_index.insert(order.id, (order.side, key));
        match order.side {
            Side::Back => {
                self.backs.insert(key, order);
            }
            Side::Lay => {
                self.lays.insert(key, order);
            }
        }
    }

    pub fn remove(&mut self, order_id: OrderId) -> Option<ExchangeBet> {
        let (side, key) = self.order_index.remove(&order_id)?;
        match side {
            Side::Back => self.backs.remove(&key),
            Side::Lay => self.lays.remove(&key),
        }
    }

    pub fn get(&self, order_id: OrderId) -> Option<&ExchangeBet> {
        let (side, key) = self.order_index.get(&order_id)?;
        match side {
            Side::Back => self.backs.get(key),
            Side::Lay => self.lays.get(key),
        }
    }

    pub fn get_mut(&mut self, order_id: OrderId) -> Option<&mut ExchangeBet> {
        let (side, key) = self.order_index.get(&order_id).copied()?;
        match side {
            Side::Back => self.backs.get_mut(&key),
            Side::Lay => self.lays.get_mut(&key),
        }
    }

    /// Price compatibility between an incoming order and a resting one on the
    /// opposite side: a backer never accepts worse odds than asked, a layer
    /// never offers more. Matched odds are always the resting order's.
    pub fn crosses(incoming_side: Side, incoming_odds: Odds, resting_odds: Odds) -> bool {
        match incoming_side {
            Side::Back => resting_odds >= incoming_odds,
            Side::Lay => resting_odds <= incoming_odds,
        }
    }

    /// Snapshot of active opposite-side orders compatible with the incoming
    /// price, in arrival order (the order every strategy expects).
    pub fn candidates(&self, incoming_side: Side, incoming_odds: Odds) -> Vec<ExchangeBet> {
        let resting = match incoming_side {
            Side::Back => &self.lays,
            Side::Lay => &self.backs,
        };
        resting
            .values()
            .filter(|o| o.is_active() && Self::crosses(incoming_side, incoming_odds, o.proposed_odds))
            .cloned()
            .collect()
    }

    /// Ids of every order still live for matching, both sides.
    pub fn active_order_ids(&self) -> Vec<OrderId> {
        self.backs
            .values()
            .chain(self.lays.values())
            .filter(|o| o.is_active())
            .map(|o| o.id)
            .collect()
    }

    /// Total active unmatched stake on one side.
    pub fn liquidity(&self, side: Side) -> Decimal {
        let resting = match side {
            Side::Back => &self.backs,
            Side::Lay => &self.lays,
        };
        resting.values().map(|o| o.available_stake()).sum()
    }

    pub fn order_count(&self) -> usize {
        self.backs.len() + self.lays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backs.is_empty() && self.lays.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderError {
    #[error("Order {0:?}: stake must be positive")]
    ZeroStake(OrderId),

    #[error("Order {0:?}: match amount must be positive")]
    ZeroMatchAmount(OrderId),

    #[error("Order {order_id:?}: match {requested} exceeds unmatched {unmatched}")]
    ExceedsUnmatched {
        order_id: OrderId,
        requested: Decimal,
        unmatched: Decimal,
    },

    #[error("Order {order_id:?} cannot be matched in state {state:?}")]
    CannotMatch {
        order_id: OrderId,
        state: OrderState,
    },

    #[error("Order {order_id:?} cannot be cancelled in state {state:?}")]
    CannotCancel {
        order_id: OrderId,
        state: OrderState,
    },

    #[error("Match requires a Back/Lay pair, got {first}/{second}")]
    NotBackLayPair { first: Side, second: Side },

    #[error("Match {match_id:?}: maker {maker_bet_id:?} is not a participant")]
    MakerNotParticipant {
        match_id: MatchId,
        maker_bet_id: OrderId,
    },

    #[error("Match {match_id:?}: bet {bet_id:?} is not a participant")]
    UnknownMatchParticipant { match_id: MatchId, bet_id: OrderId },

    #[error("Match {0:?} already settled")]
    MatchAlreadySettled(MatchId),

    #[error("Order {0:?} not found")]
    OrderNotFound(OrderId),

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

    fn order(id: u64, side: Side, odds: Decimal, stake: Decimal, ts: i64) -> ExchangeBet {
        ExchangeBet::new(
            OrderId(id),
            UserId(id),
            MarketId(1),
            OutcomeId(1),
            side,
            Odds::new_unchecked(odds),
            usd(stake),
            Timestamp::from_millis(ts),
        )
        .unwrap()
    }

    #[test]
    fn stake_invariant_through_matching() {
        let mut o = order(1, Side::Back, dec!(2.0), dec!(100), 0);
        o.apply_match(usd(dec!(40))).unwrap();

        assert_eq!(o.matched_stake.amount(), dec!(40));
        assert_eq!(o.unmatched_stake.amount(), dec!(60));
        assert_eq!(
            o.matched_stake.amount() + o.unmatched_stake.amount(),
            o.total_stake.amount()
        );
        assert_eq!(o.state, OrderState::PartiallyMatched);

        o.apply_match(usd(dec!(60))).unwrap();
        assert_eq!(o.state, OrderState::Matched);
    }

    #[test]
    fn overmatch_rejected() {
        let mut o = order(1, Side::Back, dec!(2.0), dec!(100), 0);
        let result = o.apply_match(usd(dec!(150)));
        assert!(matches!(result, Err(OrderError::ExceedsUnmatched { .. })));
        assert_eq!(o.unmatched_stake.amount(), dec!(100));
    }

    #[test]
    fn cancel_releases_unmatched_only() {
        let mut o = order(1, Side::Lay, dec!(3.0), dec!(100), 0);
        o.apply_match(usd(dec!(30))).unwrap();

        let released = o.cancel().unwrap();
        assert_eq!(released.amount(), dec!(70));
        assert_eq!(o.state, OrderState::Cancelled);
        assert_eq!(o.matched_stake.amount(), dec!(30));
        assert_eq!(o.available_stake(), Decimal::ZERO);
    }

    #[test]
    fn cancel_fully_matched_rejected() {
        let mut o = order(1, Side::Back, dec!(2.0), dec!(100), 0);
        o.apply_match(usd(dec!(100))).unwrap();
        assert!(matches!(o.cancel(), Err(OrderError::CannotCancel { .. })));
    }

    #[test]
    fn cancel_twice_rejected() {
        let mut o = order(1, Side::Back, dec!(2.0), dec!(100), 0);
        o.cancel().unwrap();
        assert!(matches!(o.cancel(), Err(OrderError::CannotCancel { .. })));
    }

    #[test]
    fn liability_by_side() {
        let back = order(1, Side::Back, dec!(3.0), dec!(100), 0);
        assert_eq!(back.liability().unwrap().amount(), dec!(100));

        let lay = order(2, Side::Lay, dec!(3.0), dec!(100), 0);
        assert_eq!(lay.liability().unwrap().amount(), dec!(200));
    }

    #[test]
    fn match_requires_back_lay_pair() {
        let a = order(1, Side::Back, dec!(2.0), dec!(100), 0);
        let b = order(2, Side::Back, dec!(2.0), dec!(100), 10);

        let result = BetMatch::create(
            MatchId(1),
            &a,
            &b,
            usd(dec!(50)),
            Odds::new_unchecked(dec!(2.0)),
            a.id,
            Timestamp::from_millis(20),
        );
        assert!(matches!(result, Err(OrderError::NotBackLayPair { .. })));
    }

    #[test]
    fn maker_must_participate() {
        let back = order(1, Side::Back, dec!(2.0), dec!(100), 0);
        let lay = order(2, Side::Lay, dec!(2.0), dec!(100), 10);

        let result = BetMatch::create(
            MatchId(1),
            &back,
            &lay,
            usd(dec!(50)),
            Odds::new_unchecked(dec!(2.0)),
            OrderId(99),
            Timestamp::from_millis(20),
        );
        assert!(matches!(result, Err(OrderError::MakerNotParticipant { .. })));
    }

    #[test]
    fn roles_derived_from_maker() {
        let back = order(1, Side::Back, dec!(2.0), dec!(100), 0);
        let lay = order(2, Side::Lay, dec!(2.0), dec!(100), 10);

        let m = BetMatch::create(
            MatchId(1),
            &back,
            &lay,
            usd(dec!(50)),
            Odds::new_unchecked(dec!(2.0)),
            back.id,
            Timestamp::from_millis(20),
        )
        .unwrap();

        assert_eq!(m.role_of(OrderId(1)).unwrap(), LiquidityRole::Maker);
        assert_eq!(m.role_of(OrderId(2)).unwrap(), LiquidityRole::Taker);
        assert_eq!(m.taker_bet_id(), OrderId(2));
        assert!(m.role_of(OrderId(3)).is_err());
    }

    #[test]
    fn gross_winnings() {
        let back = order(1, Side::Back, dec!(2.5), dec!(100), 0);
        let lay = order(2, Side::Lay, dec!(2.5), dec!(100), 10);

        let m = BetMatch::create(
            MatchId(1),
            &back,
            &lay,
            usd(dec!(100)),
            Odds::new_unchecked(dec!(2.5)),
            back.id,
            Timestamp::from_millis(20),
        )
        .unwrap();

        assert_eq!(m.gross_winnings().unwrap().amount(), dec!(150));
    }

    #[test]
    fn match_settles_exactly_once() {
        let back = order(1, Side::Back, dec!(2.0), dec!(100), 0);
        let lay = order(2, Side::Lay, dec!(2.0), dec!(100), 10);

        let mut m = BetMatch::create(
            MatchId(1),
            &back,
            &lay,
            usd(dec!(100)),
            Odds::new_unchecked(dec!(2.0)),
            back.id,
            Timestamp::from_millis(20),
        )
        .unwrap();

        m.mark_settled(OrderId(1), LiquidityRole::Maker).unwrap();
        assert!(m.settled);
        assert_eq!(m.winning_bet_id, Some(OrderId(1)));

        let second = m.mark_settled(OrderId(2), LiquidityRole::Taker);
        assert!(matches!(second, Err(OrderError::MatchAlreadySettled(_))));
        assert_eq!(m.winning_bet_id, Some(OrderId(1)));
    }

    #[test]
    fn book_candidates_filter_price_and_state() {
        let mut book = OrderBook::new();
        book.insert(order(1, Side::Lay, dec!(2.0), dec!(100), 0));
        book.insert(order(2, Side::Lay, dec!(1.8), dec!(50), 10));
        book.insert(order(3, Side::Lay, dec!(2.2), dec!(75), 20));
        book.insert(order(4, Side::Back, dec!(2.0), dec!(40), 30));

        // incoming back at 2.0 wants lay odds >= 2.0
        let candidates = book.candidates(Side::Back, Odds::new_unchecked(dec!(2.0)));
        let ids: Vec<u64> = candidates.iter().map(|o| o.id.0).collect();
        assert_eq!(ids, vec![1, 3]);

        // incoming lay at 2.0 wants back odds <= 2.0
        let candidates = book.candidates(Side::Lay, Odds::new_unchecked(dec!(2.0)));
        let ids: Vec<u64> = candidates.iter().map(|o| o.id.0).collect();
        assert_eq!(ids, vec![4]);
    }

    #[test]
    fn book_candidates_arrive_in_time_order() {
        let mut book = OrderBook::new();
        book.insert(order(2, Side::Lay, dec!(2.0), dec!(50), 100));
        book.insert(order(1, Side::Lay, dec!(2.0), dec!(100), 50));
        book.insert(order(3, Side::Lay, dec!(2.0), dec!(75), 150));

        let candidates = book.candidates(Side::Back, Odds::new_unchecked(dec!(2.0)));
        let ids: Vec<u64> = candidates.iter().map(|o| o.id.0).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn book_liquidity_skips_cancelled() {
        let mut book = OrderBook::new();
        book.insert(order(1, Side::Lay, dec!(2.0), dec!(100), 0));
        book.insert(order(2, Side::Lay, dec!(2.0), dec!(50), 10));
        book.get_mut(OrderId(2)).unwrap().cancel().unwrap();

        assert_eq!(book.liquidity(Side::Lay), dec!(100));
    }
}
