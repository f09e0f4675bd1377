//! AFK farm
//!
//! While active, the farm is ticked once per second. Every
//! `coin_interval_secs` ticks it credits `coins_per_interval` coins until the
//! window cap is hit, at which point it stops itself and refuses to restart
//! until the window rolls over.

use chrono::NaiveDateTime;
use spdm_types::AfkConfig;
use tracing::info;

use crate::error::EconomyError;
use crate::limiter::{AccumulatorState, BoundedAccumulator};
use crate::session::Session;
use crate::store::BalanceStore;

const FEATURE: &str = "AFK farm";
const SOURCE: &str = "AFK Farm";

/// What one tick did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AfkTick {
    pub elapsed_secs: u64,
    /// Coins credited on this tick
    pub granted: u32,
    /// Balance after the credit, when one happened
    pub balance: Option<i64>,
    /// Time to ask whether the user is still there
    pub music_prompt: bool,
    /// The farm stopped because the cap was reached
    pub limit_reached: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AfkStatus {
    pub active: bool,
    pub elapsed_secs: u64,
    pub earned: u32,
    pub cap: u32,
    pub remaining: u32,
    /// Minutes of farming left until the cap, `None` once capped
    pub minutes_to_limit: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct AfkFarm {
    accumulator: BoundedAccumulator,
    active: bool,
    elapsed_secs: u64,
    coin_interval_secs: u64,
    coins_per_interval: u32,
    music_prompt_secs: u64,
}

impl AfkFarm {
    pub fn new(config: &AfkConfig, now: NaiveDateTime) -> Self {
        Self::with_accumulator(
            config,
            BoundedAccumulator::new(FEATURE, config.limit.into(), now),
        )
    }

    /// Resume from a saved snapshot (same-window earnings are kept)
    pub fn restore(config: &AfkConfig, state: AccumulatorState, now: NaiveDateTime) -> Self {
        Self::with_accumulator(
            config,
            BoundedAccumulator::restore(FEATURE, config.limit.into(), state, now),
        )
    }

    fn with_accumulator(config: &AfkConfig, accumulator: BoundedAccumulator) -> Self {
        Self {
            accumulator,
            active: false,
            elapsed_secs: 0,
            coin_interval_secs: config.coin_interval_secs.max(1),
            coins_per_interval: config.coins_per_interval,
            music_prompt_secs: config.music_prompt_secs,
        }
    }

    pub fn snapshot(&self) -> AccumulatorState {
        self.accumulator.snapshot()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn earned(&self) -> u32 {
        self.accumulator.earned()
    }

    pub fn status(&mut self, now: NaiveDateTime) -> AfkStatus {
        self.accumulator.reset_if_new_window(now);
        let remaining = self.accumulator.remaining();
        let minutes_to_limit = (remaining > 0 && self.coins_per_interval > 0).then(|| {
            let intervals = u64::from(remaining.div_ceil(self.coins_per_interval));
            intervals.saturating_mul(self.coin_interval_secs).div_ceil(60)
        });
        AfkStatus {
            active: self.active,
            elapsed_secs: self.elapsed_secs,
            earned: self.accumulator.earned(),
            cap: self.accumulator.cap(),
            remaining,
            minutes_to_limit,
        }
    }

    /// Begin farming. Requires a logged-in user and room under the cap.
    pub fn start<S: BalanceStore>(
        &mut self,
        session: &Session<S>,
        now: NaiveDateTime,
    ) -> Result<(), EconomyError> {
        let user = session.require_user("use the AFK farm")?;
        self.accumulator.reset_if_new_window(now);
        if self.accumulator.is_capped() {
            return Err(EconomyError::CapReached {
                feature: FEATURE,
                cap: self.accumulator.cap(),
            });
        }
        if !self.active {
            info!(user = %user.id, earned = self.accumulator.earned(), "AFK farm started");
            self.active = true;
        }
        Ok(())
    }

    /// Halt without penalty. Returns whether the farm was running.
    pub fn stop(&mut self) -> bool {
        std::mem::replace(&mut self.active, false)
    }

    /// Advance the farm by one second.
    ///
    /// A failed credit is returned as an error and leaves the earned amount
    /// untouched; the elapsed counter still moves on.
    pub async fn tick<S: BalanceStore>(
        &mut self,
        session: &mut Session<S>,
        now: NaiveDateTime,
    ) -> Result<AfkTick, EconomyError> {
        if !self.active {
            return Ok(AfkTick {
                elapsed_secs: self.elapsed_secs,
                ..AfkTick::default()
            });
        }
        if session.user().is_none() {
            self.active = false;
            return Err(EconomyError::AuthRequired {
                action: "use the AFK farm",
            });
        }

        self.accumulator.reset_if_new_window(now);
        self.elapsed_secs += 1;

        let mut report = AfkTick {
            elapsed_secs: self.elapsed_secs,
            music_prompt: self.music_prompt_secs > 0
                && self.elapsed_secs % self.music_prompt_secs == 0,
            ..AfkTick::default()
        };

        if self.elapsed_secs % self.coin_interval_secs != 0 {
            return Ok(report);
        }

        let amount = self.accumulator.grantable(self.coins_per_interval);
        if amount > 0 {
            let event = session.add_coins(i64::from(amount), SOURCE, now).await?;
            self.accumulator.commit(amount, now)?;
            report.granted = amount;
            report.balance = Some(event.balance());
        }

        if self.accumulator.is_capped() {
            self.active = false;
            report.limit_reached = true;
            info!(
                earned = self.accumulator.earned(),
                cap = self.accumulator.cap(),
                "AFK farm reached its limit"
            );
        }

        Ok(report)
    }
}
