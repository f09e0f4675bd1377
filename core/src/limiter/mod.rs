//! Rate limiting primitives shared by every earning feature.
//!
//! - [`Window`]: when an accrual period ends
//! - [`BoundedAccumulator`]: "earn at most `cap` per window"
//! - [`Cooldown`]: "claim at most once per period"

mod accumulator;
mod cooldown;
mod window;

pub use accumulator::{AccumulatorState, BoundedAccumulator, RateLimit};
pub use cooldown::{Cooldown, can_claim};
pub use window::Window;

use chrono::TimeDelta;

/// Seconds from config as a `TimeDelta`, saturating instead of panicking
pub fn duration_secs(secs: u64) -> TimeDelta {
    i64::try_from(secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .unwrap_or(TimeDelta::MAX)
}
