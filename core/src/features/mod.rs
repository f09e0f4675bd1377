//! Earning features
//!
//! Each feature owns its limiter state and borrows the [`crate::Session`] for
//! the duration of one operation. Features never talk to the store directly
//! for coin movements, so validation and logging stay in the session.
//!
//! | Feature        | Limiter                     |
//! |----------------|-----------------------------|
//! | AFK farm       | accumulator, timer driven   |
//! | Reward links   | accumulator, per link       |
//! | Spin wheel     | accumulator, counts spins   |
//! | Daily reward   | cooldown                    |
//! | Leaderboard    | cooldown + position table   |

pub mod afk;
pub mod daily_reward;
pub mod leaderboard;
pub mod reward_links;
pub mod spin_wheel;

#[cfg(test)]
mod feature_tests;

pub use afk::{AfkFarm, AfkStatus, AfkTick};
pub use daily_reward::{DailyClaim, DailyReward};
pub use leaderboard::{Leaderboard, LeaderboardClaim, LeaderboardEntry, rank};
pub use reward_links::{LinkClaim, LinksSnapshot, RewardLink, RewardLinks};
pub use spin_wheel::{SpinOutcome, SpinSegment, SpinWheel};
