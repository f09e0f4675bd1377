//! Scenario tests for the earning features
//!
//! Runs each feature against a store wrapper that counts balance calls and can
//! be told to fail, so "rejected before dispatch" and "store failure leaves
//! the accumulator alone" can be checked directly.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use rand::SeedableRng;
use rand::rngs::StdRng;
use spdm_types::{
    AfkConfig, DailyRewardConfig, LeaderboardConfig, RewardLinkConfig, RewardLinksConfig,
    SpinWheelConfig, WalletConfig,
};

use super::*;
use crate::error::{EconomyError, ErrorKind};
use crate::session::{AuthUser, Session};
use crate::store::{
    BalanceRow, BalanceStore, Ban, ClaimField, MemoryStore, StoreError, Wallet,
};

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct TestStore {
    inner: MemoryStore,
    credits: AtomicUsize,
    fail_balance: AtomicBool,
    fail_claims: AtomicBool,
}

impl TestStore {
    /// Non-zero `add_balance` calls seen so far
    fn credits(&self) -> usize {
        self.credits.load(Ordering::SeqCst)
    }

    fn fail_balance(&self, fail: bool) {
        self.fail_balance.store(fail, Ordering::SeqCst);
    }

    fn fail_claims(&self, fail: bool) {
        self.fail_claims.store(fail, Ordering::SeqCst);
    }
}

impl BalanceStore for TestStore {
    async fn add_balance(&self, user_id: &str, amount: i64) -> Result<i64, StoreError> {
        if amount != 0 {
            if self.fail_balance.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("connection reset".to_string()));
            }
            self.credits.fetch_add(1, Ordering::SeqCst);
        }
        self.inner.add_balance(user_id, amount).await
    }

    async fn get_wallet(&self, user_id: &str) -> Result<Option<Wallet>, StoreError> {
        self.inner.get_wallet(user_id).await
    }

    async fn set_last_claim(
        &self,
        user_id: &str,
        field: ClaimField,
        at: NaiveDateTime,
    ) -> Result<(), StoreError> {
        if self.fail_claims.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("timeout".to_string()));
        }
        self.inner.set_last_claim(user_id, field, at).await
    }

    async fn set_ban(&self, user_id: &str, ban: Option<Ban>) -> Result<(), StoreError> {
        self.inner.set_ban(user_id, ban).await
    }

    async fn set_admin(&self, user_id: &str, is_admin: bool) -> Result<(), StoreError> {
        self.inner.set_admin(user_id, is_admin).await
    }

    async fn list_top_balances(
        &self,
        limit: usize,
        min_balance: i64,
    ) -> Result<Vec<BalanceRow>, StoreError> {
        self.inner.list_top_balances(limit, min_balance).await
    }
}

fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 6, d)
        .unwrap()
        .and_hms_opt(h, m, 0)
        .unwrap()
}

fn base() -> NaiveDateTime {
    at(10, 8, 0)
}

fn session_for(store: Arc<TestStore>, user: &str) -> Session<TestStore> {
    let mut session = Session::new(store, &WalletConfig::default());
    session.login(AuthUser::new(user, user));
    session
}

fn link(id: u32, coins: u32) -> RewardLinkConfig {
    RewardLinkConfig {
        id,
        name: format!("Link {id}"),
        url: format!("https://example.invalid/{id}"),
        coins,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// AFK farm
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_afk_1200_ticks_earn_exactly_the_cap() {
    let store = Arc::new(TestStore::default());
    let mut session = session_for(store.clone(), "alice");
    let mut farm = AfkFarm::new(&AfkConfig::default(), base());
    farm.start(&session, base()).unwrap();

    let mut ticks: Vec<AfkTick> = Vec::new();
    for i in 1..=1200 {
        let tick = farm
            .tick(&mut session, base() + TimeDelta::seconds(i))
            .await
            .unwrap();
        ticks.push(tick);
    }

    assert_eq!(ticks.iter().map(|t| t.granted).sum::<u32>(), 20);
    assert!(ticks.iter().rev().skip(1).all(|t| !t.limit_reached));
    assert!(ticks.last().unwrap().limit_reached);
    assert!(!farm.is_active());
    assert_eq!(session.wallet(at(10, 9, 0)).await.unwrap().balance, 120);

    // Stopped and capped: further ticks and restarts do nothing
    let later = base() + TimeDelta::seconds(1300);
    assert_eq!(farm.tick(&mut session, later).await.unwrap().granted, 0);
    let err = farm.start(&session, later).unwrap_err();
    assert!(matches!(err, EconomyError::CapReached { cap: 20, .. }));
    assert_eq!(farm.earned(), 20);
}

#[tokio::test]
async fn test_afk_music_prompt_and_status() {
    let store = Arc::new(TestStore::default());
    let mut session = session_for(store, "alice");
    let mut farm = AfkFarm::new(&AfkConfig::default(), base());

    let status = farm.status(base());
    assert_eq!(status.minutes_to_limit, Some(20));
    assert!(!status.active);

    farm.start(&session, base()).unwrap();
    let mut prompts = 0;
    for i in 1..=600 {
        let tick = farm
            .tick(&mut session, base() + TimeDelta::seconds(i))
            .await
            .unwrap();
        if tick.music_prompt {
            prompts += 1;
        }
    }
    assert_eq!(prompts, 2);

    let status = farm.status(base() + TimeDelta::seconds(600));
    assert_eq!(status.earned, 10);
    assert_eq!(status.remaining, 10);
    assert_eq!(status.minutes_to_limit, Some(10));
}

#[test]
fn test_afk_status_with_huge_interval() {
    let config = AfkConfig {
        coin_interval_secs: u64::MAX,
        ..AfkConfig::default()
    };
    let mut farm = AfkFarm::new(&config, base());
    let status = farm.status(base());
    assert_eq!(status.minutes_to_limit, Some(u64::MAX.div_ceil(60)));
}

#[tokio::test]
async fn test_afk_resumes_after_midnight() {
    let store = Arc::new(TestStore::default());
    let mut session = session_for(store, "alice");
    let late = at(10, 23, 30);
    let mut farm = AfkFarm::new(&AfkConfig::default(), late);
    farm.start(&session, late).unwrap();
    for i in 1..=1200 {
        farm.tick(&mut session, late + TimeDelta::seconds(i)).await.unwrap();
    }
    assert!(!farm.is_active());

    // Capped at 23:50, a new calendar day opens a fresh window
    let next_day = at(11, 0, 10);
    farm.start(&session, next_day).unwrap();
    assert_eq!(farm.earned(), 0);
}

#[tokio::test]
async fn test_afk_store_failure_keeps_accumulator() {
    let store = Arc::new(TestStore::default());
    let mut session = session_for(store.clone(), "alice");
    session.wallet(base()).await.unwrap();

    let mut farm = AfkFarm::new(&AfkConfig::default(), base());
    farm.start(&session, base()).unwrap();
    for i in 1..60 {
        farm.tick(&mut session, base() + TimeDelta::seconds(i)).await.unwrap();
    }

    store.fail_balance(true);
    let err = farm
        .tick(&mut session, base() + TimeDelta::seconds(60))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Remote);
    assert_eq!(farm.earned(), 0);
    assert!(farm.is_active());

    store.fail_balance(false);
    for i in 61..=120 {
        farm.tick(&mut session, base() + TimeDelta::seconds(i)).await.unwrap();
    }
    assert_eq!(farm.earned(), 1);
}

#[tokio::test]
async fn test_afk_logged_out_stops_farm() {
    let store = Arc::new(TestStore::default());
    let mut session = session_for(store, "alice");
    let mut farm = AfkFarm::new(&AfkConfig::default(), base());
    farm.start(&session, base()).unwrap();

    session.logout();
    let err = farm.tick(&mut session, base()).await.unwrap_err();
    assert!(matches!(err, EconomyError::AuthRequired { .. }));
    assert!(!farm.is_active());
    assert!(farm.start(&session, base()).is_err());
}

// ─────────────────────────────────────────────────────────────────────────────
// Reward links
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_link_over_cap_rejected_before_store_call() {
    let config = RewardLinksConfig {
        links: vec![link(1, 5), link(2, 5), link(3, 3), link(4, 5)],
        ..RewardLinksConfig::default()
    };
    let store = Arc::new(TestStore::default());
    let mut session = session_for(store.clone(), "alice");
    let mut links = RewardLinks::new(&config, base());

    for id in 1..=3 {
        links.claim(&mut session, id, base()).await.unwrap();
    }
    assert_eq!(links.earned(), 13);
    let credits = store.credits();

    let err = links.open(&session, 4, base()).unwrap_err();
    assert!(matches!(
        err,
        EconomyError::WouldExceed {
            earned: 13,
            amount: 5,
            cap: 15,
            ..
        }
    ));
    let err = links.claim(&mut session, 4, base()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Limit);

    assert_eq!(store.credits(), credits);
    assert_eq!(links.earned(), 13);
    assert!(!links.is_claimed(4));
}

#[tokio::test]
async fn test_link_claims_once_per_day() {
    let config = RewardLinksConfig {
        links: vec![link(1, 5), link(2, 5), link(3, 5), link(4, 5)],
        ..RewardLinksConfig::default()
    };
    let store = Arc::new(TestStore::default());
    let mut session = session_for(store, "alice");
    let mut links = RewardLinks::new(&config, base());

    let claim = links.claim(&mut session, 1, base()).await.unwrap();
    assert_eq!(claim.balance, 105);
    let err = links.claim(&mut session, 1, base()).await.unwrap_err();
    assert!(matches!(err, EconomyError::AlreadyClaimed(_)));

    links.claim(&mut session, 2, base()).await.unwrap();
    links.claim(&mut session, 3, base()).await.unwrap();
    let err = links.open(&session, 4, base()).unwrap_err();
    assert!(matches!(err, EconomyError::CapReached { .. }));

    let tomorrow = at(11, 8, 0);
    links.open(&session, 1, tomorrow).unwrap();
    assert!(!links.is_claimed(1));
    assert_eq!(links.earned(), 0);
}

#[tokio::test]
async fn test_link_visit_must_last_long_enough() {
    let store = Arc::new(TestStore::default());
    let mut session = session_for(store, "alice");
    let mut links = RewardLinks::new(&RewardLinksConfig::default(), base());

    links.open(&session, 2, base()).unwrap();
    let err = links
        .complete_visit(&mut session, base() + TimeDelta::seconds(10))
        .await
        .unwrap_err();
    assert!(matches!(err, EconomyError::VisitTooShort { remaining_secs: 20 }));

    // The short visit was consumed
    let err = links
        .complete_visit(&mut session, base() + TimeDelta::seconds(40))
        .await
        .unwrap_err();
    assert!(matches!(err, EconomyError::NotEligible(_)));

    links.open(&session, 2, base() + TimeDelta::seconds(50)).unwrap();
    let claim = links
        .complete_visit(&mut session, base() + TimeDelta::seconds(80))
        .await
        .unwrap();
    assert_eq!(claim.link_id, 2);
    assert_eq!(claim.earned_in_window, 5);
}

#[tokio::test]
async fn test_link_store_failure_leaves_link_unclaimed() {
    let store = Arc::new(TestStore::default());
    let mut session = session_for(store.clone(), "alice");
    session.wallet(base()).await.unwrap();
    let mut links = RewardLinks::new(&RewardLinksConfig::default(), base());

    store.fail_balance(true);
    assert!(links.claim(&mut session, 1, base()).await.is_err());
    assert_eq!(links.earned(), 0);
    assert!(!links.is_claimed(1));

    store.fail_balance(false);
    links.claim(&mut session, 1, base()).await.unwrap();
    assert_eq!(links.earned(), 5);
}

#[tokio::test]
async fn test_link_progress_survives_relogin() {
    let store = Arc::new(TestStore::default());
    let config = RewardLinksConfig::default();
    let mut session = session_for(store.clone(), "alice");
    let mut links = RewardLinks::new(&config, base());
    for id in 1..=3 {
        links.claim(&mut session, id, base()).await.unwrap();
    }
    let saved = links.snapshot();

    // Same day: cap and flags carry over
    let mut links = RewardLinks::restore(&config, saved.clone(), at(10, 9, 0));
    assert_eq!(links.earned(), 15);
    assert!(links.is_claimed(2));
    let err = links.claim(&mut session, 1, at(10, 9, 0)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Limit);
    assert_eq!(session.wallet(at(10, 9, 0)).await.unwrap().balance, 115);

    // Next day: both reset
    let links = RewardLinks::restore(&config, saved, at(11, 9, 0));
    assert_eq!(links.earned(), 0);
    assert!(!links.is_claimed(2));
}

// ─────────────────────────────────────────────────────────────────────────────
// Spin wheel
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_spin_once_per_day() {
    let store = Arc::new(TestStore::default());
    let mut session = session_for(store, "alice");
    let mut wheel = SpinWheel::new(&SpinWheelConfig::default(), base()).unwrap();
    let mut rng = StdRng::seed_from_u64(42);

    let outcome = wheel.spin(&mut session, &mut rng, base()).await.unwrap();
    assert_eq!(outcome.coins, wheel.segments()[outcome.index].coins);
    let balance = session.wallet(base()).await.unwrap().balance;
    assert_eq!(balance, 100 + i64::from(outcome.coins));

    let err = wheel
        .spin(&mut session, &mut rng, at(10, 20, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, EconomyError::CapReached { cap: 1, .. }));
    assert_eq!(wheel.spins_left(at(10, 20, 0)), 0);

    wheel.spin(&mut session, &mut rng, at(11, 9, 0)).await.unwrap();
}

#[tokio::test]
async fn test_spin_synced_from_stored_last_spin() {
    let store = Arc::new(TestStore::default());
    let mut session = session_for(store, "alice");
    session.wallet(base()).await.unwrap();
    let mut rng = StdRng::seed_from_u64(1);

    let mut first = SpinWheel::new(&SpinWheelConfig::default(), base()).unwrap();
    first.spin(&mut session, &mut rng, base()).await.unwrap();

    // A fresh wheel (new process) learns about the spin from the wallet
    let later = at(10, 12, 0);
    let wallet = session.store().get_wallet("alice").await.unwrap().unwrap();
    let mut second = SpinWheel::new(&SpinWheelConfig::default(), later).unwrap();
    second.sync_from_wallet(&wallet, later);
    assert_eq!(second.spins_left(later), 0);

    let mut next_day = SpinWheel::new(&SpinWheelConfig::default(), at(11, 8, 0)).unwrap();
    next_day.sync_from_wallet(&wallet, at(11, 8, 0));
    assert_eq!(next_day.spins_left(at(11, 8, 0)), 1);
}

#[test]
fn test_spin_wheel_rejects_zero_weights() {
    let mut config = SpinWheelConfig::default();
    for segment in &mut config.segments {
        segment.weight = 0;
    }
    assert!(SpinWheel::new(&config, base()).is_err());
}

// ─────────────────────────────────────────────────────────────────────────────
// Daily reward
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_daily_reward_cooldown() {
    let store = Arc::new(TestStore::default());
    let mut session = session_for(store, "alice");
    let mut daily = DailyReward::new(&DailyRewardConfig::default());

    assert!(daily.can_claim(&mut session, base()).await.unwrap());
    let claim = daily.claim(&mut session, base()).await.unwrap();
    assert_eq!(claim.balance, 110);
    assert_eq!(claim.next_eligible, at(11, 8, 0));

    let err = daily.claim(&mut session, at(11, 7, 59)).await.unwrap_err();
    assert!(matches!(err, EconomyError::Cooldown { next_eligible } if next_eligible == at(11, 8, 0)));

    let claim = daily.claim(&mut session, at(11, 8, 0)).await.unwrap();
    assert_eq!(claim.balance, 120);
}

#[tokio::test]
async fn test_daily_reward_guard_survives_failed_timestamp() {
    let store = Arc::new(TestStore::default());
    let mut session = session_for(store.clone(), "alice");
    let mut daily = DailyReward::new(&DailyRewardConfig::default());

    store.fail_claims(true);
    assert!(daily.claim(&mut session, base()).await.is_err());
    store.fail_claims(false);

    let err = daily.claim(&mut session, at(10, 9, 0)).await.unwrap_err();
    assert!(matches!(err, EconomyError::Cooldown { .. }));
    assert_eq!(session.wallet(at(10, 9, 0)).await.unwrap().balance, 110);
}

#[tokio::test]
async fn test_daily_reward_claims_are_per_user() {
    let store = Arc::new(TestStore::default());
    let mut daily = DailyReward::new(&DailyRewardConfig::default());

    let mut alice = session_for(store.clone(), "alice");
    daily.claim(&mut alice, base()).await.unwrap();

    let mut bob = session_for(store.clone(), "bob");
    assert!(daily.can_claim(&mut bob, base()).await.unwrap());
    assert_eq!(daily.next_eligible(&mut bob, base()).await.unwrap(), None);
    let claim = daily.claim(&mut bob, base()).await.unwrap();
    assert_eq!(claim.balance, 110);

    // A failed timestamp write only guards the user who was paid
    store.fail_claims(true);
    let mut cat = session_for(store.clone(), "cat");
    assert!(daily.claim(&mut cat, base()).await.is_err());
    store.fail_claims(false);
    assert!(matches!(
        daily.claim(&mut cat, at(10, 9, 0)).await,
        Err(EconomyError::Cooldown { .. })
    ));
    let mut dan = session_for(store, "dan");
    assert!(daily.claim(&mut dan, at(10, 9, 0)).await.is_ok());
}

// ─────────────────────────────────────────────────────────────────────────────
// Leaderboard
// ─────────────────────────────────────────────────────────────────────────────

async fn seeded_board_store() -> Arc<TestStore> {
    let store = Arc::new(TestStore::default());
    for (id, name, balance) in [("alice", "Alice", 1000), ("bob", "Bob", 500), ("cat", "", 50)] {
        store.inner.register_user(id, name).await;
        store.inner.add_balance(id, balance).await.unwrap();
    }
    store
}

#[tokio::test]
async fn test_leaderboard_reward_after_exactly_seven_days() {
    let store = seeded_board_store().await;
    store
        .inner
        .set_last_claim("alice", ClaimField::LeaderboardReward, base())
        .await
        .unwrap();
    let mut session = session_for(store.clone(), "alice");
    let mut board = Leaderboard::new(&LeaderboardConfig::default());

    let early = base() + TimeDelta::days(6) + TimeDelta::hours(23);
    let credits = store.credits();
    let err = board.claim_reward(&mut session, early).await.unwrap_err();
    assert!(matches!(err, EconomyError::Cooldown { next_eligible } if next_eligible == at(17, 8, 0)));
    assert!(err.to_string().contains("2025-06-17"));
    assert_eq!(store.credits(), credits);

    let due = base() + TimeDelta::days(7);
    let claim = board.claim_reward(&mut session, due).await.unwrap();
    assert_eq!(claim.position, 1);
    assert_eq!(claim.coins, 100);
    assert_eq!(claim.balance, 1100);

    let wallet = store.get_wallet("alice").await.unwrap().unwrap();
    assert_eq!(wallet.last_leaderboard_reward_claim, Some(due));
}

#[tokio::test]
async fn test_leaderboard_positions_and_unpaid_rank() {
    let store = seeded_board_store().await;
    let mut session = session_for(store.clone(), "cat");
    let mut board = Leaderboard::new(&LeaderboardConfig::default());

    let entries = board.refresh(&session, base()).await.unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[2].username, "Unknown");
    assert!(!board.needs_refresh(base() + TimeDelta::seconds(29)));
    assert!(board.needs_refresh(base() + TimeDelta::seconds(30)));

    let claim = board.claim_reward(&mut session, base()).await.unwrap();
    assert_eq!((claim.position, claim.coins), (3, 25));

    let mut session = session_for(store, "dave");
    let err = board.claim_reward(&mut session, base()).await.unwrap_err();
    assert!(matches!(err, EconomyError::NotEligible(_)));
}

#[tokio::test]
async fn test_leaderboard_timestamp_failure_still_blocks_repeat() {
    let store = seeded_board_store().await;
    let mut session = session_for(store.clone(), "bob");
    let mut board = Leaderboard::new(&LeaderboardConfig::default());

    store.fail_claims(true);
    let err = board.claim_reward(&mut session, base()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Remote);
    store.fail_claims(false);

    // Coins were paid once and the session remembers the claim
    assert_eq!(store.get_wallet("bob").await.unwrap().unwrap().balance, 550);
    let err = board.claim_reward(&mut session, at(10, 9, 0)).await.unwrap_err();
    assert!(matches!(err, EconomyError::Cooldown { .. }));
    assert!(!board.can_claim(&mut session, at(10, 9, 0)).await.unwrap());
}

#[tokio::test]
async fn test_leaderboard_balance_failure_leaves_timestamp() {
    let store = seeded_board_store().await;
    let mut session = session_for(store.clone(), "alice");
    let mut board = Leaderboard::new(&LeaderboardConfig::default());

    store.fail_balance(true);
    assert!(board.claim_reward(&mut session, base()).await.is_err());
    store.fail_balance(false);

    let wallet = store.get_wallet("alice").await.unwrap().unwrap();
    assert_eq!(wallet.last_leaderboard_reward_claim, None);
    assert!(board.claim_reward(&mut session, base()).await.is_ok());
}

#[tokio::test]
async fn test_leaderboard_claims_are_per_user() {
    let store = seeded_board_store().await;
    let mut board = Leaderboard::new(&LeaderboardConfig::default());

    store.fail_claims(true);
    let mut alice = session_for(store.clone(), "alice");
    assert!(board.claim_reward(&mut alice, base()).await.is_err());
    store.fail_claims(false);

    let mut bob = session_for(store.clone(), "bob");
    assert!(board.can_claim(&mut bob, base()).await.unwrap());
    let claim = board.claim_reward(&mut bob, base()).await.unwrap();
    assert_eq!((claim.position, claim.coins), (2, 50));

    let err = board.claim_reward(&mut alice, at(10, 9, 0)).await.unwrap_err();
    assert!(matches!(err, EconomyError::Cooldown { .. }));
}
