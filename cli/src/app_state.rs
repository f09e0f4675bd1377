use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Local, NaiveDateTime};
use rand::SeedableRng;
use rand::rngs::StdRng;
use spdm_core::config::ConfigError;
use spdm_core::features::LinksSnapshot;
use spdm_core::limiter::AccumulatorState;
use spdm_core::{
    AfkFarm, AuthUser, DailyReward, EconomyError, KeyPool, Leaderboard, MemoryStore, PromoBook,
    RewardLinks, Session, Shop, SpinWheel,
};
use spdm_types::EconomyConfig;
use tokio::task::JoinHandle;

/// Local wall-clock time; every window and cooldown is measured in it
pub fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Per-user feature progress kept while someone else is logged in
#[derive(Debug, Clone)]
struct UserProgress {
    afk: AccumulatorState,
    links: LinksSnapshot,
}

/// Everything the shell works on, shared with the AFK ticker task
pub struct AppState {
    pub config: EconomyConfig,
    pub store: Arc<MemoryStore>,
    pub store_path: Option<PathBuf>,
    pub session: Session<MemoryStore>,
    pub afk: AfkFarm,
    pub links: RewardLinks,
    pub wheel: SpinWheel,
    pub daily: DailyReward,
    pub leaderboard: Leaderboard,
    pub shop: Shop,
    pub promos: PromoBook,
    pub rng: StdRng,
    pub afk_task: Option<JoinHandle<()>>,
    /// Progress of users who logged out, restored on their next login
    progress: HashMap<String, UserProgress>,
}

impl AppState {
    pub fn new(
        config: EconomyConfig,
        store: Arc<MemoryStore>,
        store_path: Option<PathBuf>,
        keys: KeyPool,
    ) -> Result<Self, ConfigError> {
        let now = now();
        Ok(Self {
            session: Session::new(Arc::clone(&store), &config.wallet),
            afk: AfkFarm::new(&config.afk, now),
            links: RewardLinks::new(&config.reward_links, now),
            wheel: SpinWheel::new(&config.spin_wheel, now)?,
            daily: DailyReward::new(&config.daily_reward),
            leaderboard: Leaderboard::new(&config.leaderboard),
            shop: Shop::new(&config.shop, keys),
            promos: PromoBook::new(),
            rng: StdRng::from_entropy(),
            afk_task: None,
            progress: HashMap::new(),
            store,
            store_path,
            config,
        })
    }

    /// Switch the session to `user`, restoring their earlier progress.
    /// Banned users are refused and nobody stays logged in.
    pub async fn login(
        &mut self,
        user: AuthUser,
        now: NaiveDateTime,
    ) -> Result<AuthUser, EconomyError> {
        self.logout();
        let user = self.session.sign_in(user, now).await?.clone();

        match self.progress.remove(&user.id) {
            Some(saved) => {
                self.afk = AfkFarm::restore(&self.config.afk, saved.afk, now);
                self.links = RewardLinks::restore(&self.config.reward_links, saved.links, now);
            }
            None => {
                self.afk = AfkFarm::new(&self.config.afk, now);
                self.links = RewardLinks::new(&self.config.reward_links, now);
            }
        }
        self.wheel.reset(now);
        if let Some(wallet) = self.session.cached_wallet() {
            self.wheel.sync_from_wallet(wallet, now);
        }
        Ok(user)
    }

    /// Stop the farm and remember the user's progress. Returns the user that
    /// was logged in.
    pub fn logout(&mut self) -> Option<AuthUser> {
        self.stop_afk_task();
        self.afk.stop();
        let user = self.session.logout()?;
        self.progress.insert(
            user.id.clone(),
            UserProgress {
                afk: self.afk.snapshot(),
                links: self.links.snapshot(),
            },
        );
        Some(user)
    }

    pub fn stop_afk_task(&mut self) {
        if let Some(handle) = self.afk_task.take() {
            handle.abort();
        }
    }
}
