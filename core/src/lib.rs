pub mod admin;
pub mod config;
pub mod error;
pub mod features;
pub mod limiter;
pub mod promo;
pub mod session;
pub mod shop;
pub mod store;

// Re-exports for convenience
pub use config::ConfigError;
pub use error::{EconomyError, ErrorKind, Notice, Severity};
pub use features::{AfkFarm, DailyReward, Leaderboard, RewardLinks, SpinWheel};
pub use limiter::{BoundedAccumulator, Cooldown, RateLimit, Window};
pub use promo::PromoBook;
pub use session::{AuthUser, CoinEvent, Role, Session};
pub use shop::{KeyPool, Shop};
pub use store::{BalanceStore, MemoryStore, StoreError, Wallet};
