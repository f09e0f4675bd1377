use chrono::{NaiveDateTime, TimeDelta};

use crate::store::{ClaimField, Wallet};

/// Local copy of the session user's wallet.
///
/// The store stays the source of truth. The cache only saves round trips:
/// - an entry older than `max_age` is treated as missing
/// - a balance returned by the store replaces the cached one in place
/// - `invalidate` drops the entry (login, logout, unknown outcome)
#[derive(Debug, Clone)]
pub struct WalletCache {
    entry: Option<(Wallet, NaiveDateTime)>,
    max_age: TimeDelta,
}

impl WalletCache {
    pub fn new(max_age: TimeDelta) -> Self {
        Self {
            entry: None,
            max_age,
        }
    }

    /// Cached wallet if it is still fresh at `now`
    pub fn get(&self, now: NaiveDateTime) -> Option<&Wallet> {
        let (wallet, fetched_at) = self.entry.as_ref()?;
        let age = now - *fetched_at;
        (age >= TimeDelta::zero() && age < self.max_age).then_some(wallet)
    }

    /// Cached wallet regardless of age
    pub fn peek(&self) -> Option<&Wallet> {
        self.entry.as_ref().map(|(wallet, _)| wallet)
    }

    pub fn store(&mut self, wallet: Wallet, now: NaiveDateTime) {
        self.entry = Some((wallet, now));
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    /// Apply an authoritative balance returned by the store
    pub fn apply_balance(&mut self, balance: i64) {
        if let Some((wallet, _)) = &mut self.entry {
            wallet.balance = balance;
        }
    }

    pub fn apply_claim(&mut self, field: ClaimField, at: NaiveDateTime) {
        if let Some((wallet, _)) = &mut self.entry {
            wallet.set_last_claim(field, at);
        }
    }
}
