// 16.1 engine/core.rs: main engine. holds all events, markets, users,
// wallets, bets, orders, and matches.

use super::config::EngineConfig;
use super::results::EngineError;
use crate::allocation::MatchingStrategy;
use crate::bet::Bet;
use crate::event::SportEvent;
use crate::events::{
    AuditEvent, AuditId, AuditPayload, DepositEvent, TierChangedEvent, WithdrawalEvent,
    WithdrawalRejectedEvent,
};
use crate::ledger::WalletStore;
use crate::market::Market;
use crate::money::Money;
use crate::order::{BetMatch, OrderBook};
use crate::types::{
    BetId, CurrencyCode, EventId, MarketId, MatchId, OrderId, OutcomeId, Timestamp, UserId,
};
use crate::user::UserProfile;
use crate::wallet::Wallet;
use std::collections::HashMap;

/** 16.1.1: main engine struct. all state lives here */
pub struct Engine {
    pub(super) config: EngineConfig,
    pub(super) strategy: Box<dyn MatchingStrategy + Send + Sync>,
    pub(super) events: HashMap<EventId, SportEvent>,
    pub(super) markets: HashMap<MarketId, Market>,
    pub(super) users: HashMap<UserId, UserProfile>,
    pub(super) wallets: WalletStore,
    pub(super) bets: HashMap<BetId, Bet>,
    pub(super) books: HashMap<OutcomeId, OrderBook>,
    pub(super) order_index: HashMap<OrderId, OutcomeId>,
    pub(super) matches: HashMap<MatchId, BetMatch>,
    pub(super) audit: Vec<AuditEvent>,
    pub(super) next_audit_id: u64,
    pub(super) next_bet_id: u64,
    pub(super) next_order_id: u64,
    pub(super) next_match_id: u64,
    pub(super) current_time: Timestamp,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let strategy = config.exchange.matching.build();
        Self {
            config,
            strategy,
            events: HashMap::new(),
            markets: HashMap::new(),
            users: HashMap::new(),
            wallets: WalletStore::new(),
            bets: HashMap::new(),
            books: HashMap::new(),
            order_index: HashMap::new(),
            matches: HashMap::new(),
            audit: Vec::new(),
            next_audit_id: 1,
            next_bet_id: 1,
            next_order_id: 1,
            next_match_id: 1,
            current_time: Timestamp::from_millis(0),
        }
    }

    pub fn set_time(&mut self, timestamp: Timestamp) {
        self.current_time = timestamp;
    }

    pub fn time(&self) -> Timestamp {
        self.current_time
    }

    pub fn advance_time(&mut self, millis: i64) {
        self.current_time = Timestamp::from_millis(self.current_time.as_millis() + millis);
    }

    pub fn add_event(&mut self, event: SportEvent) -> EventId {
        let event_id = event.id;
        self.events.insert(event_id, event);
        event_id
    }

    pub fn add_market(&mut self, market: Market) -> Result<MarketId, EngineError> {
        if !self.events.contains_key(&market.event_id) {
            return Err(crate::event::EventError::EventNotFound(market.event_id).into());
        }
        let market_id = market.id;
        for outcome in &market.outcomes {
            self.books.entry(outcome.id).or_insert_with(OrderBook::new);
        }
        self.markets.insert(market_id, market);
        Ok(market_id)
    }

    pub fn register_user(&mut self, name: impl Into<String>, currency: CurrencyCode) -> UserId {
        let id = UserId(self.users.len() as u64 + 1);
        let user = UserProfile::new(id, name, currency, self.current_time);
        self.wallets.create(id, currency);
        self.users.insert(id, user);
        id
    }

    pub fn start_event(&mut self, event_id: EventId) -> Result<(), EngineError> {
        self.event_mut(event_id)?.start()?;
        Ok(())
    }

    pub fn suspend_event(&mut self, event_id: EventId) -> Result<(), EngineError> {
        self.event_mut(event_id)?.suspend()?;
        Ok(())
    }

    pub fn resume_event(&mut self, event_id: EventId) -> Result<(), EngineError> {
        self.event_mut(event_id)?.resume()?;
        Ok(())
    }

    fn event_mut(&mut self, event_id: EventId) -> Result<&mut SportEvent, EngineError> {
        Ok(self
            .events
            .get_mut(&event_id)
            .ok_or(crate::event::EventError::EventNotFound(event_id))?)
    }

    pub fn get_event(&self, event_id: EventId) -> Option<&SportEvent> {
        self.events.get(&event_id)
    }

    pub fn get_market(&self, market_id: MarketId) -> Option<&Market> {
        self.markets.get(&market_id)
    }

    pub fn get_user(&self, user_id: UserId) -> Option<&UserProfile> {
        self.users.get(&user_id)
    }

    pub fn get_bet(&self, bet_id: BetId) -> Option<&Bet> {
        self.bets.get(&bet_id)
    }

    pub fn get_order(&self, order_id: OrderId) -> Option<&crate::order::ExchangeBet> {
        let outcome_id = self.order_index.get(&order_id)?;
        self.books.get(outcome_id)?.get(order_id)
    }

    pub fn get_match(&self, match_id: MatchId) -> Option<&BetMatch> {
        self.matches.get(&match_id)
    }

    pub fn wallet(&self, user_id: UserId) -> Result<Wallet, EngineError> {
        Ok(self.wallets.load(user_id)?)
    }

    pub fn balance(&self, user_id: UserId) -> Result<Money, EngineError> {
        Ok(self.wallets.balance_of(user_id)?)
    }

    pub fn deposit(&mut self, user_id: UserId, amount: Money) -> Result<(), EngineError> {
        let retry = self.config.exchange.retry;
        let committed = self.wallets.update(user_id, retry, |w| w.deposit(amount))?;

        self.emit_audit(AuditPayload::Deposit(DepositEvent {
            user_id,
            amount,
            new_balance: committed.balance,
        }));
        Ok(())
    }

    pub fn withdraw(&mut self, user_id: UserId, amount: Money) -> Result<(), EngineError> {
        let retry = self.config.exchange.retry;
        match self.wallets.update(user_id, retry, |w| w.withdraw(amount)) {
            Ok(committed) => {
                self.emit_audit(AuditPayload::Withdrawal(WithdrawalEvent {
                    user_id,
                    amount,
                    new_balance: committed.balance,
                }));
                Ok(())
            }
            Err(e) => {
                // rejection is audited for reconciliation
                self.emit_audit(AuditPayload::WithdrawalRejected(WithdrawalRejectedEvent {
                    user_id,
                    amount,
                    reason: e.to_string(),
                }));
                Err(e.into())
            }
        }
    }

    /// Recompute a user's commission tier from their statistics. True only
    /// when the tier actually changed.
    pub fn update_user_tier(&mut self, user_id: UserId) -> Result<bool, EngineError> {
        let schedule = self.config.exchange.commission.clone();
        let user = self
            .users
            .get_mut(&user_id)
            .ok_or(EngineError::UserNotFound(user_id))?;

        let before = user.tier;
        let changed = schedule.update_user_tier(user);
        if changed {
            let to = user.tier;
            self.emit_audit(AuditPayload::TierChanged(TierChangedEvent {
                user_id,
                from: before,
                to,
            }));
        }
        Ok(changed)
    }

    pub fn recent_audit(&self, count: usize) -> &[AuditEvent] {
        let start = self.audit.len().saturating_sub(count);
        &self.audit[start..]
    }

    pub fn audit_events(&self) -> &[AuditEvent] {
        &self.audit
    }

    pub(super) fn emit_audit(&mut self, payload: AuditPayload) {
        let event = AuditEvent::new(AuditId(self.next_audit_id), self.current_time, payload);
        self.next_audit_id += 1;

        if self.config.verbose {
            println!("[Audit {}] {:?}", event.id.0, event.payload);
        }

        self.audit.push(event);

        if self.audit.len() > self.config.max_audit_events {
            let drain_count = self.audit.len() - self.config.max_audit_events;
            self.audit.drain(0..drain_count);
        }
    }

    pub(super) fn next_bet_id(&mut self) -> BetId {
        let id = BetId(self.next_bet_id);
        self.next_bet_id += 1;
        id
    }

    pub(super) fn next_order_id(&mut self) -> OrderId {
        let id = OrderId(self.next_order_id);
        self.next_order_id += 1;
        id
    }

    pub(super) fn next_match_id(&mut self) -> MatchId {
        let id = MatchId(self.next_match_id);
        self.next_match_id += 1;
        id
    }
}
