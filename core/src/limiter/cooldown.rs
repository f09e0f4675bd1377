use chrono::{NaiveDateTime, TimeDelta};

use crate::error::EconomyError;

/// `true` if no claim was ever made or at least `period` has passed since it.
pub fn can_claim(now: NaiveDateTime, last_claim: Option<NaiveDateTime>, period: TimeDelta) -> bool {
    last_claim.is_none_or(|last| now - last >= period)
}

/// Minimum time between two claims of a one-time reward.
///
/// Two states only: eligible or cooling down. The "last claimed" timestamp is
/// owned by the balance store, the cooldown only interprets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cooldown {
    period: TimeDelta,
}

impl Cooldown {
    pub fn new(period: TimeDelta) -> Self {
        Self { period }
    }

    pub fn days(days: u32) -> Self {
        Self::new(TimeDelta::days(i64::from(days)))
    }

    pub fn hours(hours: u32) -> Self {
        Self::new(TimeDelta::hours(i64::from(hours)))
    }

    pub fn period(&self) -> TimeDelta {
        self.period
    }

    pub fn can_claim(&self, now: NaiveDateTime, last_claim: Option<NaiveDateTime>) -> bool {
        can_claim(now, last_claim, self.period)
    }

    /// When the next claim opens, `None` if it is open for any `now`
    pub fn next_eligible(&self, last_claim: Option<NaiveDateTime>) -> Option<NaiveDateTime> {
        let last = last_claim?;
        Some(last.checked_add_signed(self.period).unwrap_or(NaiveDateTime::MAX))
    }

    /// Time left until the next claim, zero when eligible
    pub fn remaining(&self, now: NaiveDateTime, last_claim: Option<NaiveDateTime>) -> TimeDelta {
        match self.next_eligible(last_claim) {
            Some(next) if next > now => next - now,
            _ => TimeDelta::zero(),
        }
    }

    pub fn check(
        &self,
        now: NaiveDateTime,
        last_claim: Option<NaiveDateTime>,
    ) -> Result<(), EconomyError> {
        if self.can_claim(now, last_claim) {
            return Ok(());
        }
        let next_eligible = self.next_eligible(last_claim).unwrap_or(now);
        Err(EconomyError::Cooldown { next_eligible })
    }
}
