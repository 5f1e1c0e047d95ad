// 12.0 wallet.rs: per-user balance with running totals. every mutator
// re-validates currency and non-negativity. the version field is the
// optimistic concurrency token, bumped by the ledger on each committed
// mutation (see ledger.rs).

use crate::money::{Money, MoneyError};
use crate::types::{CurrencyCode, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    pub user_id: UserId,
    pub balance: Money,
    pub total_deposited: Money,
    pub total_withdrawn: Money,
    pub total_bet: Money,
    pub total_won: Money,
    /// Concurrency token. Compared on commit, bumped by the store.
    pub version: u64,
}

impl Wallet {
    pub fn new(user_id: UserId, currency: CurrencyCode) -> Self {
        Self {
            user_id,
            balance: Money::zero(currency),
            total_deposited: Money::zero(currency),
            total_withdrawn: Money::zero(currency),
            total_bet: Money::zero(currency),
            total_won: Money::zero(currency),
            version: 0,
        }
    }

    pub fn currency(&self) -> CurrencyCode {
        self.balance.currency()
    }

    fn require_positive(amount: Money) -> Result<(), WalletError> {
        if amount.is_zero() {
            return Err(WalletError::ZeroAmount);
        }
        Ok(())
    }

    pub fn deposit(&mut self, amount: Money) -> Result<(), WalletError> {
        Self::require_positive(amount)?;
        self.balance = self.balance.add(amount)?;
        self.total_deposited = self.total_deposited.add(amount)?;
        Ok(())
    }

    pub fn withdraw(&mut self, amount: Money) -> Result<(), WalletError> {
        Self::require_positive(amount)?;
        self.balance = self.debit(amount)?;
        self.total_withdrawn = self.total_withdrawn.add(amount)?;
        Ok(())
    }

    /// Deduct a stake (or lay liability) for a placed bet or order.
    pub fn debit_stake(&mut self, amount: Money) -> Result<(), WalletError> {
        Self::require_positive(amount)?;
        self.balance = self.debit(amount)?;
        self.total_bet = self.total_bet.add(amount)?;
        Ok(())
    }

    /// Credit a payout or refund. Zero payouts are a legal no-op so losing
    /// settlements can run through the same path.
    pub fn credit_payout(&mut self, amount: Money) -> Result<(), WalletError> {
        if amount.is_zero() {
            return Ok(());
        }
        self.balance = self.balance.add(amount)?;
        self.total_won = self.total_won.add(amount)?;
        Ok(())
    }

    /// Return a previously reserved amount without counting it as winnings.
    pub fn release_reservation(&mut self, amount: Money) -> Result<(), WalletError> {
        if amount.is_zero() {
            return Ok(());
        }
        self.balance = self.balance.add(amount)?;
        Ok(())
    }

    fn debit(&self, amount: Money) -> Result<Money, WalletError> {
        self.balance.sub(amount).map_err(|e| match e {
            MoneyError::Overdraw { requested, .. } => WalletError::InsufficientFunds {
                user_id: self.user_id,
                requested,
                available: self.balance.amount(),
            },
            other => WalletError::Money(other),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WalletError {
    #[error("Wallet {user_id:?}: insufficient funds, requested {requested}, available {available}")]
    InsufficientFunds {
        user_id: UserId,
        requested: Decimal,
        available: Decimal,
    },

    #[error("Amount must be positive")]
    ZeroAmount,

    #[error(transparent)]
    Money(#[from] MoneyError),
}
