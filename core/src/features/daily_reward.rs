//! Daily reward: a fixed amount, claimable once per cooldown period.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use spdm_types::DailyRewardConfig;
use tracing::{info, warn};

use crate::error::EconomyError;
use crate::limiter::Cooldown;
use crate::session::Session;
use crate::store::{BalanceStore, ClaimField, UserId};

const SOURCE: &str = "Daily Reward";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyClaim {
    pub coins: u32,
    pub balance: i64,
    pub next_eligible: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct DailyReward {
    cooldown: Cooldown,
    coins: u32,
    /// Claims paid in this process, per user; covers a timestamp write that failed
    local_claims: HashMap<UserId, NaiveDateTime>,
}

impl DailyReward {
    pub fn new(config: &DailyRewardConfig) -> Self {
        Self {
            cooldown: Cooldown::hours(config.cooldown_hours),
            coins: config.coins,
            local_claims: HashMap::new(),
        }
    }

    pub fn coins(&self) -> u32 {
        self.coins
    }

    fn last_claim(&self, user_id: &str, stored: Option<NaiveDateTime>) -> Option<NaiveDateTime> {
        stored.max(self.local_claims.get(user_id).copied())
    }

    pub async fn can_claim<S: BalanceStore>(
        &self,
        session: &mut Session<S>,
        now: NaiveDateTime,
    ) -> Result<bool, EconomyError> {
        let wallet = session.wallet(now).await?;
        Ok(self.cooldown.can_claim(
            now,
            self.last_claim(&wallet.user_id, wallet.last_reward_claim),
        ))
    }

    pub async fn next_eligible<S: BalanceStore>(
        &self,
        session: &mut Session<S>,
        now: NaiveDateTime,
    ) -> Result<Option<NaiveDateTime>, EconomyError> {
        let wallet = session.wallet(now).await?;
        Ok(self
            .cooldown
            .next_eligible(self.last_claim(&wallet.user_id, wallet.last_reward_claim))
            .filter(|next| *next > now))
    }

    pub async fn claim<S: BalanceStore>(
        &mut self,
        session: &mut Session<S>,
        now: NaiveDateTime,
    ) -> Result<DailyClaim, EconomyError> {
        let user_id = session.require_user("claim the daily reward")?.id.clone();
        let wallet = session.wallet(now).await?;
        self.cooldown
            .check(now, self.last_claim(&user_id, wallet.last_reward_claim))?;

        let event = session.add_coins(i64::from(self.coins), SOURCE, now).await?;
        self.local_claims.insert(user_id.clone(), now);

        if let Err(e) = session.record_claim(ClaimField::DailyReward, now).await {
            warn!(user = %user_id, error = %e, "daily reward paid but claim time not saved");
            return Err(e);
        }
        info!(user = %user_id, coins = self.coins, balance = event.balance(), "daily reward claimed");

        Ok(DailyClaim {
            coins: self.coins,
            balance: event.balance(),
            next_eligible: self.cooldown.next_eligible(Some(now)).unwrap_or(now),
        })
    }
}
