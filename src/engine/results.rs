// 16.0.2: result types and errors for engine operations.

use crate::bet::BetError;
use crate::commission::CommissionError;
use crate::event::EventError;
use crate::ledger::LedgerError;
use crate::market::MarketError;
use crate::money::{Money, MoneyError};
use crate::order::OrderError;
use crate::settlement::SettlementError;
use crate::types::{BetId, LiquidityRole, MarketId, MatchId, OrderId, UserId};
use crate::wallet::WalletError;
use rust_decimal::Decimal;

/// Result of matching an incoming order against the book.
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub order_id: OrderId,
    pub matches: Vec<MatchId>,
    pub matched_amount: Money,
    pub unmatched_amount: Money,
}

/// Result of settling one exchange match.
#[derive(Debug, Clone)]
pub struct MatchSettlementResult {
    pub match_id: MatchId,
    /// None when the deciding outcome voided and both stakes were returned
    pub winning_bet_id: Option<OrderId>,
    pub winner_role: Option<LiquidityRole>,
    pub gross_winnings: Money,
    pub commission: Money,
    pub payout: Money,
}

/// Result of an event-level settlement pass.
#[derive(Debug, Clone, Default)]
pub struct EventSettlementResult {
    pub settled_markets: Vec<MarketId>,
    /// Markets with no automatic settlement rule, left untouched
    pub skipped_markets: Vec<MarketId>,
    pub cancelled_orders: usize,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    #[error("User {0:?} not found")]
    UserNotFound(UserId),

    #[error("Order {order_id:?}: owner {owner:?} cannot take their own order")]
    SelfMatch { order_id: OrderId, owner: UserId },

    #[error("Order {order_id:?} does not belong to user {user_id:?}")]
    NotOrderOwner { order_id: OrderId, user_id: UserId },

    #[error("Bet {0:?} not found")]
    BetNotFound(BetId),

    #[error("Match {0:?} not found")]
    MatchNotFound(MatchId),

    #[error("Stake {stake} outside limits [{min}, {max}]")]
    StakeOutOfRange {
        stake: Decimal,
        min: Decimal,
        max: Decimal,
    },

    #[error("Event error: {0}")]
    Event(#[from] EventError),

    #[error("Market error: {0}")]
    Market(#[from] MarketError),

    #[error("Bet error: {0}")]
    Bet(#[from] BetError),

    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    #[error("Settlement error: {0}")]
    Settlement(#[from] SettlementError),

    #[error("Wallet error: {0}")]
    Wallet(#[from] WalletError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Commission config error: {0}")]
    Commission(#[from] CommissionError),

    #[error("Money error: {0}")]
    Money(#[from] MoneyError),
}
