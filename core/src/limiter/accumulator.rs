use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use spdm_types::LimitConfig;

use super::Window;
use crate::error::EconomyError;

/// Cap per window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub cap: u32,
    pub window: Window,
}

impl RateLimit {
    pub fn new(cap: u32, window: Window) -> Self {
        Self { cap, window }
    }

    pub fn daily(cap: u32) -> Self {
        Self::new(cap, Window::CalendarDay)
    }
}

impl From<LimitConfig> for RateLimit {
    fn from(config: LimitConfig) -> Self {
        Self::new(config.cap, config.window.into())
    }
}

/// Persistable part of an accumulator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccumulatorState {
    pub earned_in_window: u32,
    pub window_start: NaiveDateTime,
    #[serde(default)]
    pub last_action: Option<NaiveDateTime>,
}

/// Accrues an amount per window without ever exceeding the window cap.
///
/// The accumulator is purely local bookkeeping. It is advanced with
/// [`commit`](Self::commit) only after the balance store accepted the matching
/// credit, so a failed store call leaves it untouched.
///
/// Invariant: `earned() <= cap()`.
#[derive(Debug, Clone)]
pub struct BoundedAccumulator {
    feature: &'static str,
    limit: RateLimit,
    state: AccumulatorState,
}

impl BoundedAccumulator {
    pub fn new(feature: &'static str, limit: RateLimit, now: NaiveDateTime) -> Self {
        Self {
            feature,
            limit,
            state: AccumulatorState {
                earned_in_window: 0,
                window_start: now,
                last_action: None,
            },
        }
    }

    /// Rebuild from a persisted snapshot.
    ///
    /// Values above the cap (edited or written under an older config) are
    /// clamped, and a snapshot from an earlier window is reset.
    pub fn restore(
        feature: &'static str,
        limit: RateLimit,
        mut state: AccumulatorState,
        now: NaiveDateTime,
    ) -> Self {
        state.earned_in_window = state.earned_in_window.min(limit.cap);
        let mut acc = Self {
            feature,
            limit,
            state,
        };
        acc.reset_if_new_window(now);
        acc
    }

    pub fn snapshot(&self) -> AccumulatorState {
        self.state.clone()
    }

    /// Start a new window if `now` is outside the current one.
    /// Returns true if a reset happened.
    pub fn reset_if_new_window(&mut self, now: NaiveDateTime) -> bool {
        if self.limit.window.contains(self.state.window_start, now) {
            return false;
        }
        tracing::debug!(
            feature = self.feature,
            earned = self.state.earned_in_window,
            "window rolled over, resetting"
        );
        self.state.earned_in_window = 0;
        self.state.window_start = now;
        true
    }

    // --- Accessors ---

    pub fn feature(&self) -> &'static str {
        self.feature
    }

    pub fn limit(&self) -> RateLimit {
        self.limit
    }

    pub fn cap(&self) -> u32 {
        self.limit.cap
    }

    pub fn earned(&self) -> u32 {
        self.state.earned_in_window
    }

    pub fn remaining(&self) -> u32 {
        self.limit.cap - self.state.earned_in_window
    }

    pub fn is_capped(&self) -> bool {
        self.state.earned_in_window >= self.limit.cap
    }

    pub fn window_start(&self) -> NaiveDateTime {
        self.state.window_start
    }

    pub fn last_action(&self) -> Option<NaiveDateTime> {
        self.state.last_action
    }

    // --- Accrual ---

    /// Reject `amount` unless all of it fits in the current window.
    pub fn check(&self, amount: u32) -> Result<(), EconomyError> {
        if amount == 0 {
            return Err(EconomyError::InvalidAmount(0));
        }
        if self.is_capped() {
            return Err(EconomyError::CapReached {
                feature: self.feature,
                cap: self.limit.cap,
            });
        }
        if amount > self.remaining() {
            return Err(EconomyError::WouldExceed {
                feature: self.feature,
                earned: self.state.earned_in_window,
                amount,
                cap: self.limit.cap,
            });
        }
        Ok(())
    }

    /// How much of `amount` still fits (timer-driven accrual grants partially)
    pub fn grantable(&self, amount: u32) -> u32 {
        amount.min(self.remaining())
    }

    /// Record an accepted accrual. Returns the new earned amount.
    pub fn commit(&mut self, amount: u32, now: NaiveDateTime) -> Result<u32, EconomyError> {
        self.check(amount)?;
        self.state.earned_in_window += amount;
        self.state.last_action = Some(now);
        Ok(self.state.earned_in_window)
    }

    /// Raise the earned amount to at least `amount` (clamped to the cap), for
    /// accruals the store knows about but this accumulator missed.
    pub fn raise_to(&mut self, amount: u32, now: NaiveDateTime) {
        let target = amount.min(self.limit.cap);
        if target > self.state.earned_in_window {
            self.state.earned_in_window = target;
            self.state.last_action = Some(now);
        }
    }
}
