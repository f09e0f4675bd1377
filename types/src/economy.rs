//! Economy configuration
//!
//! Every tunable constant of the coin economy lives here: caps, windows,
//! accrual rates, cooldowns, prices. All fields are defaulted so a partial
//! TOML file only needs to name what it overrides.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════════
// Rate limits
// ═══════════════════════════════════════════════════════════════════════════

/// The repeating period after which an accumulator resets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WindowKind {
    /// Resets when the local calendar date changes
    #[default]
    CalendarDay,
    /// Resets when the ISO week changes
    CalendarWeek,
    /// Resets `secs` seconds after the window started
    Rolling { secs: u64 },
}

/// Cap on how much may accrue within one window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitConfig {
    pub cap: u32,
    #[serde(default)]
    pub window: WindowKind,
}

impl LimitConfig {
    pub const fn daily(cap: u32) -> Self {
        Self {
            cap,
            window: WindowKind::CalendarDay,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Features
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Balance granted when a wallet is first created
    pub starting_balance: i64,
    /// Seconds a cached wallet snapshot stays fresh
    pub cache_max_age_secs: u64,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            starting_balance: 100,
            cache_max_age_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AfkConfig {
    pub limit: LimitConfig,
    /// Ticks (seconds) between two grants
    pub coin_interval_secs: u64,
    pub coins_per_interval: u32,
    /// Ticks between two "still listening?" music prompts
    pub music_prompt_secs: u64,
}

impl Default for AfkConfig {
    fn default() -> Self {
        Self {
            limit: LimitConfig::daily(20),
            coin_interval_secs: 60,
            coins_per_interval: 1,
            music_prompt_secs: 5 * 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardLinkConfig {
    pub id: u32,
    pub name: String,
    pub url: String,
    pub coins: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardLinksConfig {
    pub limit: LimitConfig,
    /// Minimum time the user must stay on the reward page
    pub min_away_secs: u64,
    #[serde(rename = "link")]
    pub links: Vec<RewardLinkConfig>,
}

impl Default for RewardLinksConfig {
    fn default() -> Self {
        let link = |id: u32, host: &str| RewardLinkConfig {
            id,
            name: format!("Reward {id}"),
            url: format!("https://{host}/1351367/reward-{id}"),
            coins: 5,
        };
        Self {
            limit: LimitConfig::daily(15),
            min_away_secs: 30,
            links: vec![
                link(1, "direct-link.net"),
                link(2, "link-hub.net"),
                link(3, "link-center.net"),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpinSegmentConfig {
    pub label: String,
    pub coins: u32,
    /// Relative probability; zero-weight segments are never drawn
    pub weight: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpinWheelConfig {
    /// Cap counts spins, not coins
    pub limit: LimitConfig,
    #[serde(rename = "segment")]
    pub segments: Vec<SpinSegmentConfig>,
}

impl Default for SpinWheelConfig {
    fn default() -> Self {
        let seg = |coins: u32, weight: u32| SpinSegmentConfig {
            label: if coins == 0 {
                "Try again".to_string()
            } else {
                format!("{coins} coins")
            },
            coins,
            weight,
        };
        Self {
            limit: LimitConfig::daily(1),
            segments: vec![
                seg(0, 20),
                seg(5, 30),
                seg(10, 25),
                seg(25, 15),
                seg(50, 8),
                seg(100, 2),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DailyRewardConfig {
    pub cooldown_hours: u32,
    pub coins: u32,
}

impl Default for DailyRewardConfig {
    fn default() -> Self {
        Self {
            cooldown_hours: 24,
            coins: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaderboardConfig {
    /// Number of rows fetched
    pub size: usize,
    /// Wallets below this balance are not listed
    pub min_balance: i64,
    pub refresh_secs: u64,
    pub cooldown_days: u32,
    /// Reward for position 1, 2, 3, ... (index 0 is first place)
    pub position_rewards: Vec<u32>,
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self {
            size: 10,
            min_balance: 1,
            refresh_secs: 30,
            cooldown_days: 7,
            position_rewards: vec![100, 50, 25],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopItemConfig {
    pub id: String,
    pub name: String,
    pub duration_label: String,
    pub duration_days: u32,
    pub price: u32,
    pub description: String,
    /// File name (inside the key directory) holding one key per line
    pub key_file: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShopConfig {
    /// Directory holding key files; platform data dir when unset
    pub keys_dir: Option<PathBuf>,
    #[serde(rename = "item")]
    pub items: Vec<ShopItemConfig>,
}

impl Default for ShopConfig {
    fn default() -> Self {
        let item = |id: &str, label: &str, days: u32, price: u32, desc: &str, file: &str| {
            ShopItemConfig {
                id: id.to_string(),
                name: format!("{label} Key"),
                duration_label: label.to_string(),
                duration_days: days,
                price,
                description: desc.to_string(),
                key_file: file.to_string(),
            }
        };
        Self {
            keys_dir: None,
            items: vec![
                item("key_1day", "1 Day", 1, 20, "Access to premium features for 24 hours", "1day.txt"),
                item("key_7days", "7 Days", 7, 100, "Access to premium features for a full week", "7days.txt"),
                item("key_30days", "30 Days", 30, 500, "Access to premium features for a month", "1month.txt"),
                item("key_1year", "1 Year", 365, 2000, "Access to premium features for a full year", "1year.txt"),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Largest single balance adjustment an admin (non-owner) may make
    pub adjust_limit: i64,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self { adjust_limit: 500 }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Root
// ═══════════════════════════════════════════════════════════════════════════

/// Complete economy configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyConfig {
    pub wallet: WalletConfig,
    pub afk: AfkConfig,
    pub reward_links: RewardLinksConfig,
    pub spin_wheel: SpinWheelConfig,
    pub daily_reward: DailyRewardConfig,
    pub leaderboard: LeaderboardConfig,
    pub shop: ShopConfig,
    pub admin: AdminConfig,
}
