// 13.0 ledger.rs: concurrency-safe wallet mutation. every change goes
// snapshot -> mutate -> version-checked commit; a commit against a stale
// version is rejected whole and the caller retries with backoff. this is the
// only contention mechanism, there is no pessimistic locking.

use crate::types::{CurrencyCode, UserId};
use crate::wallet::{Wallet, WalletError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

/// Bounded retry settings for optimistic commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Sleep `base_delay_ms * attempt` between attempts. Zero disables
    /// sleeping, which tests rely on.
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 10,
        }
    }
}

impl RetryPolicy {
    pub fn no_delay() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 0,
        }
    }
}

/// In-memory wallet store with compare-and-swap commits. The lock guards the
/// map only for the duration of a load or commit, never across a mutation.
#[derive(Debug, Default)]
pub struct WalletStore {
    wallets: RwLock<HashMap<UserId, Wallet>>,
}

impl WalletStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, user_id: UserId, currency: CurrencyCode) {
        let mut wallets = self.wallets.write().expect("wallet store poisoned");
        wallets
            .entry(user_id)
            .or_insert_with(|| Wallet::new(user_id, currency));
    }

    /// Snapshot a wallet together with its current version token.
    pub fn load(&self, user_id: UserId) -> Result<Wallet, LedgerError> {
        let wallets = self.wallets.read().expect("wallet store poisoned");
        wallets
            .get(&user_id)
            .cloned()
            .ok_or(LedgerError::WalletNotFound(user_id))
    }

    /// Atomic conditional commit: applies the mutated snapshot only if the
    /// stored version still matches the snapshot's, bumping the token.
    /// Nothing is partially applied on rejection.
    pub fn commit(&self, mutated: Wallet) -> Result<Wallet, LedgerError> {
        let mut wallets = self.wallets.write().expect("wallet store poisoned");
        let stored = wallets
            .get_mut(&mutated.user_id)
            .ok_or(LedgerError::WalletNotFound(mutated.user_id))?;

        if stored.version != mutated.version {
            return Err(LedgerError::Conflict {
                user_id: mutated.user_id,
                attempts: 1,
            });
        }

        let mut committed = mutated;
        committed.version += 1;
        *stored = committed.clone();
        Ok(committed)
    }

    /// The bounded-retry mutation wrapper: load a fresh snapshot, apply the
    /// closure, attempt the conditional commit; on conflict, back off and
    /// retry up to the policy limit. Domain failures from the closure abort
    /// immediately (they would fail identically on any snapshot).
    pub fn update<F>(
        &self,
        user_id: UserId,
        policy: RetryPolicy,
        mut mutate: F,
    ) -> Result<Wallet, LedgerError>
    where
        F: FnMut(&mut Wallet) -> Result<(), WalletError>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;

            let mut snapshot = self.load(user_id)?;
            mutate(&mut snapshot)?;

            match self.commit(snapshot) {
                Ok(committed) => return Ok(committed),
                Err(LedgerError::Conflict { .. }) if attempt < policy.max_attempts => {
                    if policy.base_delay_ms > 0 {
                        std::thread::sleep(Duration::from_millis(
                            policy.base_delay_ms * u64::from(attempt),
                        ));
                    }
                }
                Err(LedgerError::Conflict { user_id, .. }) => {
                    return Err(LedgerError::Conflict {
                        user_id,
                        attempts: attempt,
                    })
                }
                Err(other) => return Err(other),
            }
        }
    }

    pub fn balance_of(&self, user_id: UserId) -> Result<crate::money::Money, LedgerError> {
        Ok(self.load(user_id)?.balance)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("Wallet for user {0:?} not found")]
    WalletNotFound(UserId),

    #[error("Optimistic commit rejected for user {user_id:?} after {attempts} attempt(s)")]
    Conflict { user_id: UserId, attempts: u32 },

    #[error(transparent)]
    Wallet(#[from] WalletError),
}
