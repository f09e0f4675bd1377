//! Centralized number formatting utilities.
//!
//! All coin and timer display formatting goes through this module so the CLI
//! and any other frontend render balances, progress and countdowns the same way.

/// Format a coin amount with `,` thousands separators.
///
/// # Examples
/// ```
/// use spdm_types::formatting::format_coins;
/// assert_eq!(format_coins(0), "0");
/// assert_eq!(format_coins(999), "999");
/// assert_eq!(format_coins(1_500), "1,500");
/// assert_eq!(format_coins(-2_000_000), "-2,000,000");
/// ```
pub fn format_coins(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let lead = match digits.len() % 3 {
        0 => 3,
        r => r,
    };
    let mut out = String::from(if n < 0 { "-" } else { "" });
    out.push_str(&digits[..lead]);
    for group in digits.as_bytes()[lead..].chunks(3) {
        out.push(',');
        out.extend(group.iter().map(|b| char::from(*b)));
    }
    out
}

/// Format elapsed seconds as a zero-padded `MM:SS` timer face.
///
/// Minutes are not wrapped into hours; a long AFK session simply shows
/// three-digit minutes.
///
/// # Examples
/// ```
/// use spdm_types::formatting::format_timer;
/// assert_eq!(format_timer(0), "00:00");
/// assert_eq!(format_timer(61), "01:01");
/// assert_eq!(format_timer(1200), "20:00");
/// assert_eq!(format_timer(6000), "100:00");
/// ```
pub fn format_timer(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Format a whole-percent ratio, rounded to the nearest percent.
///
/// A zero total renders as `0%`.
///
/// # Examples
/// ```
/// use spdm_types::formatting::format_pct_ratio;
/// assert_eq!(format_pct_ratio(13, 15), "87%");
/// assert_eq!(format_pct_ratio(20, 20), "100%");
/// assert_eq!(format_pct_ratio(5, 0), "0%");
/// ```
pub fn format_pct_ratio(count: u32, total: u32) -> String {
    if total == 0 {
        return "0%".to_string();
    }
    format!("{:.0}%", f64::from(count) / f64::from(total) * 100.0)
}

/// Format an accumulator's progress as `earned / cap coins (pct)`.
///
/// # Examples
/// ```
/// use spdm_types::formatting::format_progress;
/// assert_eq!(format_progress(13, 15), "13 / 15 coins (87%)");
/// ```
pub fn format_progress(earned: u32, cap: u32) -> String {
    format!("{} / {} coins ({})", earned, cap, format_pct_ratio(earned, cap))
}

/// Format a remaining wait as `Xd Yh`, `Xh Ym` or `Xm Ys`, dropping the
/// largest unit once it reaches zero.
///
/// # Examples
/// ```
/// use spdm_types::formatting::format_wait;
/// assert_eq!(format_wait(90), "1m 30s");
/// assert_eq!(format_wait(3 * 3600 + 5 * 60), "3h 5m");
/// assert_eq!(format_wait(6 * 86_400 + 23 * 3600), "6d 23h");
/// ```
pub fn format_wait(secs: u64) -> String {
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3600;
    let mins = (secs % 3600) / 60;
    if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h {}m", hours, mins)
    } else {
        format!("{}m {}s", mins, secs % 60)
    }
}
