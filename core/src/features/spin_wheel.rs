//! Spin wheel
//!
//! One spin per window. The landing segment is drawn with the configured
//! weights; segments worth zero coins are a valid (unlucky) outcome and make
//! no balance call.

use chrono::NaiveDateTime;
use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};
use spdm_types::SpinWheelConfig;
use tracing::{info, warn};

use crate::config::ConfigError;
use crate::error::EconomyError;
use crate::limiter::BoundedAccumulator;
use crate::session::Session;
use crate::store::{BalanceStore, ClaimField, Wallet};

const FEATURE: &str = "spin wheel";
const SOURCE: &str = "Spin Wheel";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpinSegment {
    pub label: String,
    pub coins: u32,
    pub weight: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpinOutcome {
    /// Index of the winning segment
    pub index: usize,
    pub label: String,
    pub coins: u32,
    /// New balance, `None` when nothing was won
    pub balance: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct SpinWheel {
    segments: Vec<SpinSegment>,
    weights: WeightedIndex<u32>,
    accumulator: BoundedAccumulator,
}

impl SpinWheel {
    pub fn new(config: &SpinWheelConfig, now: NaiveDateTime) -> Result<Self, ConfigError> {
        let weights = WeightedIndex::new(config.segments.iter().map(|s| s.weight))
            .map_err(|e| ConfigError::Invalid(format!("spin wheel segments: {e}")))?;
        let segments = config
            .segments
            .iter()
            .map(|s| SpinSegment {
                label: s.label.clone(),
                coins: s.coins,
                weight: s.weight,
            })
            .collect();
        Ok(Self {
            segments,
            weights,
            accumulator: BoundedAccumulator::new(FEATURE, config.limit.into(), now),
        })
    }

    pub fn segments(&self) -> &[SpinSegment] {
        &self.segments
    }

    /// Forget the spins counted so far, e.g. when another user logs in
    pub fn reset(&mut self, now: NaiveDateTime) {
        self.accumulator = BoundedAccumulator::new(FEATURE, self.accumulator.limit(), now);
    }

    pub fn spins_left(&mut self, now: NaiveDateTime) -> u32 {
        self.accumulator.reset_if_new_window(now);
        self.accumulator.remaining()
    }

    /// Count a `last_spin` the store already has for this window as used.
    pub fn sync_from_wallet(&mut self, wallet: &Wallet, now: NaiveDateTime) {
        self.accumulator.reset_if_new_window(now);
        let Some(last_spin) = wallet.last_spin else {
            return;
        };
        if self.accumulator.limit().window.contains(last_spin, now) {
            self.accumulator.raise_to(1, last_spin);
        }
    }

    pub async fn spin<S: BalanceStore, R: Rng + ?Sized>(
        &mut self,
        session: &mut Session<S>,
        rng: &mut R,
        now: NaiveDateTime,
    ) -> Result<SpinOutcome, EconomyError> {
        session.require_user("spin the wheel")?;
        self.accumulator.reset_if_new_window(now);
        self.accumulator.check(1)?;

        let index = self.weights.sample(rng);
        let segment = &self.segments[index];
        let coins = segment.coins;
        let label = segment.label.clone();

        let balance = if coins > 0 {
            let event = session.add_coins(i64::from(coins), SOURCE, now).await?;
            Some(event.balance())
        } else {
            None
        };
        self.accumulator.commit(1, now)?;
        info!(segment = %label, coins, "wheel spun");

        if let Err(e) = session.record_claim(ClaimField::Spin, now).await {
            warn!(error = %e, "could not record last spin");
        }

        Ok(SpinOutcome {
            index,
            label,
            coins,
            balance,
        })
    }
}
