// 14.0: every state change produces an audit event. used for audit trails,
// state reconstruction, and notifying external systems. the AuditPayload enum
// lists all event types.

use crate::bet::BetStatus;
use crate::commission::CommissionTier;
use crate::market::OutcomeResult;
use crate::money::Money;
use crate::odds::Odds;
use crate::types::{
    BetId, EventId, LiquidityRole, MarketId, MatchId, OrderId, OutcomeId, Side, Timestamp, UserId,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AuditId(pub u64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: AuditId,
    pub timestamp: Timestamp,
    pub payload: AuditPayload,
}

impl AuditEvent {
    pub fn new(id: AuditId, timestamp: Timestamp, payload: AuditPayload) -> Self {
        Self {
            id,
            timestamp,
            payload,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AuditPayload {
    // sportsbook events
    BetPlaced(BetPlacedEvent),
    BetSettled(BetSettledEvent),
    BetVoided(BetVoidedEvent),

    // exchange events
    OrderPlaced(OrderPlacedEvent),
    OrderMatched(OrderMatchedEvent),
    OrderCancelled(OrderCancelledEvent),
    MatchSettled(MatchSettledEvent),
    MatchVoided(MatchVoidedEvent),

    // market/event lifecycle
    MarketSettled(MarketSettledEvent),
    EventCompleted(EventCompletedEvent),
    EventCancelled(EventCancelledEvent),

    // wallet events
    Deposit(DepositEvent),
    Withdrawal(WithdrawalEvent),
    WithdrawalRejected(WithdrawalRejectedEvent),

    // commission events
    CommissionCharged(CommissionChargedEvent),
    TierChanged(TierChangedEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetPlacedEvent {
    pub bet_id: BetId,
    pub user_id: UserId,
    pub stake: Money,
    pub combined_odds: Odds,
    pub leg_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetSettledEvent {
    pub bet_id: BetId,
    pub user_id: UserId,
    pub status: BetStatus,
    pub payout: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetVoidedEvent {
    pub bet_id: BetId,
    pub user_id: UserId,
    pub refund: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPlacedEvent {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub outcome_id: OutcomeId,
    pub side: Side,
    pub proposed_odds: Odds,
    pub stake: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderMatchedEvent {
    pub match_id: MatchId,
    pub back_bet_id: OrderId,
    pub lay_bet_id: OrderId,
    pub maker_bet_id: OrderId,
    pub matched_stake: Money,
    pub matched_odds: Odds,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCancelledEvent {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub released_stake: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchSettledEvent {
    pub match_id: MatchId,
    pub winning_bet_id: OrderId,
    pub winner_role: LiquidityRole,
    pub gross_winnings: Money,
    pub commission: Money,
    pub payout: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchVoidedEvent {
    pub match_id: MatchId,
    pub back_refund: Money,
    pub lay_refund: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSettledEvent {
    pub market_id: MarketId,
    pub results: Vec<(OutcomeId, OutcomeResult)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventCompletedEvent {
    pub event_id: EventId,
    pub home_score: u32,
    pub away_score: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventCancelledEvent {
    pub event_id: EventId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositEvent {
    pub user_id: UserId,
    pub amount: Money,
    pub new_balance: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalEvent {
    pub user_id: UserId,
    pub amount: Money,
    pub new_balance: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalRejectedEvent {
    pub user_id: UserId,
    pub amount: Money,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommissionChargedEvent {
    pub user_id: UserId,
    pub match_id: MatchId,
    pub role: LiquidityRole,
    pub rate: Decimal,
    pub amount: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierChangedEvent {
    pub user_id: UserId,
    pub from: CommissionTier,
    pub to: CommissionTier,
}
