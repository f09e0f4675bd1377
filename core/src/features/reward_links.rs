//! Reward links
//!
//! The user opens a sponsor link, stays on it for a minimum time, and comes
//! back to collect the link's coins. Each link pays once per window and the
//! window total is capped. A link that would push the total over the cap is
//! refused outright, never partially paid.

use std::collections::HashSet;

use chrono::{NaiveDateTime, TimeDelta};
use spdm_types::RewardLinksConfig;
use tracing::{debug, info};

use crate::error::EconomyError;
use crate::limiter::{AccumulatorState, BoundedAccumulator, RateLimit, duration_secs};
use crate::session::Session;
use crate::store::BalanceStore;

const FEATURE: &str = "reward links";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardLink {
    pub id: u32,
    pub name: String,
    pub url: String,
    pub coins: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingVisit {
    link_id: u32,
    opened_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkClaim {
    pub link_id: u32,
    pub coins: u32,
    pub balance: i64,
    pub earned_in_window: u32,
}

/// A user's link progress, kept across logins
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinksSnapshot {
    pub accumulator: AccumulatorState,
    pub claimed: HashSet<u32>,
}

#[derive(Debug, Clone)]
pub struct RewardLinks {
    links: Vec<RewardLink>,
    claimed: HashSet<u32>,
    accumulator: BoundedAccumulator,
    min_away: TimeDelta,
    pending: Option<PendingVisit>,
}

impl RewardLinks {
    pub fn new(config: &RewardLinksConfig, now: NaiveDateTime) -> Self {
        Self::with_state(
            config,
            BoundedAccumulator::new(FEATURE, config.limit.into(), now),
            HashSet::new(),
        )
    }

    /// Resume a user's progress. Flags from an earlier window are dropped
    /// along with its earnings.
    pub fn restore(config: &RewardLinksConfig, snapshot: LinksSnapshot, now: NaiveDateTime) -> Self {
        let limit: RateLimit = config.limit.into();
        let claimed = if limit.window.contains(snapshot.accumulator.window_start, now) {
            snapshot.claimed
        } else {
            HashSet::new()
        };
        let accumulator = BoundedAccumulator::restore(FEATURE, limit, snapshot.accumulator, now);
        Self::with_state(config, accumulator, claimed)
    }

    fn with_state(
        config: &RewardLinksConfig,
        accumulator: BoundedAccumulator,
        claimed: HashSet<u32>,
    ) -> Self {
        let links = config
            .links
            .iter()
            .map(|l| RewardLink {
                id: l.id,
                name: l.name.clone(),
                url: l.url.clone(),
                coins: l.coins,
            })
            .collect();
        Self {
            links,
            claimed,
            accumulator,
            min_away: duration_secs(config.min_away_secs),
            pending: None,
        }
    }

    pub fn snapshot(&self) -> LinksSnapshot {
        LinksSnapshot {
            accumulator: self.accumulator.snapshot(),
            claimed: self.claimed.clone(),
        }
    }

    // --- Accessors ---

    pub fn links(&self) -> &[RewardLink] {
        &self.links
    }

    pub fn is_claimed(&self, link_id: u32) -> bool {
        self.claimed.contains(&link_id)
    }

    pub fn earned(&self) -> u32 {
        self.accumulator.earned()
    }

    pub fn cap(&self) -> u32 {
        self.accumulator.cap()
    }

    pub fn pending_link(&self) -> Option<u32> {
        self.pending.map(|p| p.link_id)
    }

    /// Reset the window (and per-link flags) if `now` is past it
    pub fn roll_window(&mut self, now: NaiveDateTime) {
        if self.accumulator.reset_if_new_window(now) {
            self.claimed.clear();
        }
    }

    fn eligible(&self, link_id: u32) -> Result<&RewardLink, EconomyError> {
        let link = self
            .links
            .iter()
            .find(|l| l.id == link_id)
            .ok_or_else(|| EconomyError::NotFound {
                what: "reward link",
                id: link_id.to_string(),
            })?;
        if self.claimed.contains(&link_id) {
            return Err(EconomyError::AlreadyClaimed(link.name.clone()));
        }
        self.accumulator.check(link.coins)?;
        Ok(link)
    }

    // --- Operations ---

    /// Start a visit to `link_id`. Returns the link so the caller can open its URL.
    pub fn open<S: BalanceStore>(
        &mut self,
        session: &Session<S>,
        link_id: u32,
        now: NaiveDateTime,
    ) -> Result<RewardLink, EconomyError> {
        session.require_user("claim rewards")?;
        self.roll_window(now);
        let link = self.eligible(link_id)?.clone();
        debug!(link = link.id, "reward link opened");
        self.pending = Some(PendingVisit {
            link_id,
            opened_at: now,
        });
        Ok(link)
    }

    /// The user came back from the pending visit. Pays out if they stayed
    /// long enough; the visit is consumed either way.
    pub async fn complete_visit<S: BalanceStore>(
        &mut self,
        session: &mut Session<S>,
        now: NaiveDateTime,
    ) -> Result<LinkClaim, EconomyError> {
        let visit = self
            .pending
            .take()
            .ok_or_else(|| EconomyError::NotEligible("no reward page was opened".to_string()))?;

        let away = now - visit.opened_at;
        if away < self.min_away {
            let short = self.min_away - away;
            let remaining_secs = u64::try_from((short.num_milliseconds() + 999) / 1000).unwrap_or(0);
            return Err(EconomyError::VisitTooShort { remaining_secs });
        }

        self.claim(session, visit.link_id, now).await
    }

    /// Pay out `link_id` once for this window.
    pub async fn claim<S: BalanceStore>(
        &mut self,
        session: &mut Session<S>,
        link_id: u32,
        now: NaiveDateTime,
    ) -> Result<LinkClaim, EconomyError> {
        session.require_user("claim rewards")?;
        self.roll_window(now);

        let (coins, source) = {
            let link = self.eligible(link_id)?;
            (link.coins, format!("{} reward", link.name))
        };

        let event = session.add_coins(i64::from(coins), &source, now).await?;
        let earned_in_window = self.accumulator.commit(coins, now)?;
        self.claimed.insert(link_id);
        info!(link = link_id, coins, earned_in_window, "reward link claimed");

        Ok(LinkClaim {
            link_id,
            coins,
            balance: event.balance(),
            earned_in_window,
        })
    }
}
