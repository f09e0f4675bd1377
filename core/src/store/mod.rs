//! # Balance store
//!
//! The remote side of the economy: wallets, the signed balance update, claim
//! timestamps and the leaderboard query. In the hosted portal these are tables
//! and stored procedures of a backend service; here they are a trait so the
//! economy can run against any backend and tests can inject failures.
//!
//! ## Contract
//! - `add_balance` is an atomic signed increment. `0` is a pure read.
//!   Results below zero are rejected with [`StoreError::InsufficientBalance`].
//!   The first call for an unknown user creates the wallet.
//! - `set_ban` and `set_admin` update an existing wallet only; unknown users
//!   are [`StoreError::UnknownUser`].
//! - `list_top_balances` orders by descending balance; tie order is up to the
//!   backend.
//! - Nothing here validates *why* a balance changes. Caps and cooldowns are
//!   enforced by whoever holds the [`crate::Session`]; if that is a browser,
//!   the economy is client-trusted.

mod memory;

use std::future::Future;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use memory::MemoryStore;

pub type UserId = String;

/// Server-side wallet row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub user_id: UserId,
    pub balance: i64,
    #[serde(default = "default_level")]
    pub level: u32,
    #[serde(default)]
    pub last_reward_claim: Option<NaiveDateTime>,
    #[serde(default)]
    pub last_leaderboard_reward_claim: Option<NaiveDateTime>,
    #[serde(default)]
    pub last_spin: Option<NaiveDateTime>,
    /// Granted by an owner; applies on the user's next sign-in
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub ban: Option<Ban>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ban {
    pub reason: String,
    pub banned_by: UserId,
    pub banned_at: NaiveDateTime,
}

fn default_level() -> u32 {
    1
}

impl Wallet {
    pub fn new(user_id: impl Into<UserId>, balance: i64) -> Self {
        Self {
            user_id: user_id.into(),
            balance,
            level: default_level(),
            last_reward_claim: None,
            last_leaderboard_reward_claim: None,
            last_spin: None,
            is_admin: false,
            ban: None,
        }
    }

    pub fn last_claim(&self, field: ClaimField) -> Option<NaiveDateTime> {
        match field {
            ClaimField::DailyReward => self.last_reward_claim,
            ClaimField::LeaderboardReward => self.last_leaderboard_reward_claim,
            ClaimField::Spin => self.last_spin,
        }
    }

    pub fn set_last_claim(&mut self, field: ClaimField, at: NaiveDateTime) {
        match field {
            ClaimField::DailyReward => self.last_reward_claim = Some(at),
            ClaimField::LeaderboardReward => self.last_leaderboard_reward_claim = Some(at),
            ClaimField::Spin => self.last_spin = Some(at),
        }
    }
}

/// Which "last claimed" timestamp of a wallet to update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimField {
    DailyReward,
    LeaderboardReward,
    Spin,
}

/// One leaderboard row as returned by the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceRow {
    pub user_id: UserId,
    pub username: String,
    pub balance: i64,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("balance store unavailable: {0}")]
    Unavailable(String),

    #[error("unknown user {0}")]
    UnknownUser(UserId),

    #[error("balance of {user_id} would drop below zero ({balance} {change:+})")]
    InsufficientBalance {
        user_id: UserId,
        balance: i64,
        change: i64,
    },

    #[error("balance overflow for {0}")]
    Overflow(UserId),

    #[error("store rejected the request: {0}")]
    Rejected(String),

    #[error("store file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store file is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Balance-update collaborator
pub trait BalanceStore: Send + Sync {
    /// Apply a signed change and return the new balance
    fn add_balance(
        &self,
        user_id: &str,
        amount: i64,
    ) -> impl Future<Output = Result<i64, StoreError>> + Send;

    fn get_wallet(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Option<Wallet>, StoreError>> + Send;

    fn set_last_claim(
        &self,
        user_id: &str,
        field: ClaimField,
        at: NaiveDateTime,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Ban (`Some`) or unban (`None`) a user
    fn set_ban(
        &self,
        user_id: &str,
        ban: Option<Ban>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn set_admin(
        &self,
        user_id: &str,
        is_admin: bool,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn list_top_balances(
        &self,
        limit: usize,
        min_balance: i64,
    ) -> impl Future<Output = Result<Vec<BalanceRow>, StoreError>> + Send;
}
