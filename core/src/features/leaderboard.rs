//! Leaderboard and the weekly position reward.
//!
//! The board is pulled from the store and cached for `refresh_secs`. The top
//! positions may claim a reward once per cooldown period. The claim credits
//! the coins first and records the claim time second; if the second step
//! fails the error is surfaced, but the board still remembers the claim for
//! that user.

use std::collections::HashMap;

use chrono::{NaiveDateTime, TimeDelta};
use spdm_types::LeaderboardConfig;
use tracing::{debug, error, info};

use crate::error::EconomyError;
use crate::limiter::{Cooldown, duration_secs};
use crate::session::Session;
use crate::store::{BalanceRow, BalanceStore, ClaimField, UserId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    /// 1-based
    pub position: usize,
    pub user_id: String,
    pub username: String,
    pub balance: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardClaim {
    pub position: usize,
    pub coins: u32,
    pub balance: i64,
    pub next_eligible: NaiveDateTime,
}

/// Number rows in store order. Blank usernames show as "Unknown".
pub fn rank(rows: Vec<BalanceRow>) -> Vec<LeaderboardEntry> {
    rows.into_iter()
        .enumerate()
        .map(|(i, row)| LeaderboardEntry {
            position: i + 1,
            username: if row.username.trim().is_empty() {
                "Unknown".to_string()
            } else {
                row.username
            },
            user_id: row.user_id,
            balance: row.balance,
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct Leaderboard {
    entries: Vec<LeaderboardEntry>,
    fetched_at: Option<NaiveDateTime>,
    size: usize,
    min_balance: i64,
    refresh_every: TimeDelta,
    cooldown: Cooldown,
    rewards: Vec<u32>,
    local_claims: HashMap<UserId, NaiveDateTime>,
}

impl Leaderboard {
    pub fn new(config: &LeaderboardConfig) -> Self {
        Self {
            entries: Vec::new(),
            fetched_at: None,
            size: config.size,
            min_balance: config.min_balance,
            refresh_every: duration_secs(config.refresh_secs),
            cooldown: Cooldown::days(config.cooldown_days),
            rewards: config.position_rewards.clone(),
            local_claims: HashMap::new(),
        }
    }

    pub fn entries(&self) -> &[LeaderboardEntry] {
        &self.entries
    }

    pub fn needs_refresh(&self, now: NaiveDateTime) -> bool {
        self.fetched_at.is_none_or(|at| now - at >= self.refresh_every)
    }

    /// Reload the board. Viewing needs no login.
    pub async fn refresh<S: BalanceStore>(
        &mut self,
        session: &Session<S>,
        now: NaiveDateTime,
    ) -> Result<&[LeaderboardEntry], EconomyError> {
        let rows = session
            .store()
            .list_top_balances(self.size, self.min_balance)
            .await
            .map_err(|e| {
                error!(error = %e, "leaderboard query failed");
                EconomyError::Store(e)
            })?;
        self.entries = rank(rows);
        self.fetched_at = Some(now);
        debug!(rows = self.entries.len(), "leaderboard refreshed");
        Ok(&self.entries)
    }

    /// Coins for finishing at `position`, if it pays anything
    pub fn reward_for(&self, position: usize) -> Option<u32> {
        position
            .checked_sub(1)
            .and_then(|i| self.rewards.get(i).copied())
            .filter(|coins| *coins > 0)
    }

    pub fn position_of(&self, user_id: &str) -> Option<usize> {
        self.entries
            .iter()
            .find(|e| e.user_id == user_id)
            .map(|e| e.position)
    }

    fn last_claim(&self, user_id: &str, stored: Option<NaiveDateTime>) -> Option<NaiveDateTime> {
        stored.max(self.local_claims.get(user_id).copied())
    }

    /// Whether the session user holds a paying position and is off cooldown
    pub async fn can_claim<S: BalanceStore>(
        &mut self,
        session: &mut Session<S>,
        now: NaiveDateTime,
    ) -> Result<bool, EconomyError> {
        let user_id = session.require_user("claim leaderboard rewards")?.id.clone();
        if self.needs_refresh(now) {
            self.refresh(session, now).await?;
        }
        let wallet = session.wallet(now).await?;
        let paying = self
            .position_of(&user_id)
            .and_then(|p| self.reward_for(p))
            .is_some();
        Ok(paying
            && self
                .cooldown
                .can_claim(now, self.last_claim(&user_id, wallet.last_leaderboard_reward_claim)))
    }

    pub async fn claim_reward<S: BalanceStore>(
        &mut self,
        session: &mut Session<S>,
        now: NaiveDateTime,
    ) -> Result<LeaderboardClaim, EconomyError> {
        let user_id = session.require_user("claim leaderboard rewards")?.id.clone();

        let wallet = session.wallet(now).await?;
        self.cooldown
            .check(now, self.last_claim(&user_id, wallet.last_leaderboard_reward_claim))?;

        if self.needs_refresh(now) {
            self.refresh(session, now).await?;
        }
        let position = self.position_of(&user_id).ok_or_else(|| {
            EconomyError::NotEligible("you are not on the leaderboard".to_string())
        })?;
        let coins = self.reward_for(position).ok_or_else(|| {
            EconomyError::NotEligible(format!("position {position} has no reward"))
        })?;

        let source = format!("Top {position} Leaderboard Reward");
        let event = session.add_coins(i64::from(coins), &source, now).await?;
        self.local_claims.insert(user_id.clone(), now);

        if let Err(e) = session
            .record_claim(ClaimField::LeaderboardReward, now)
            .await
        {
            error!(user = %user_id, position, error = %e, "leaderboard reward paid but claim time not saved");
            return Err(e);
        }
        info!(user = %user_id, position, coins, "leaderboard reward claimed");

        Ok(LeaderboardClaim {
            position,
            coins,
            balance: event.balance(),
            next_eligible: self.cooldown.next_eligible(Some(now)).unwrap_or(now),
        })
    }
}
