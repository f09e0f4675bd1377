use chrono::{Datelike, NaiveDateTime, TimeDelta};
use spdm_types::WindowKind;

/// Accrual period of a [`super::BoundedAccumulator`].
///
/// Calendar windows compare local wall-clock dates, so a window ends at local
/// midnight (or the Monday of a new ISO week), not 24h after it started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    CalendarDay,
    CalendarWeek,
    Rolling(TimeDelta),
}

impl Window {
    /// Whether `now` still falls in the window that began at `start`.
    ///
    /// A `now` earlier than `start` (clock moved backwards) counts as the same
    /// window so a skewed clock cannot be used to reset a cap.
    pub fn contains(&self, start: NaiveDateTime, now: NaiveDateTime) -> bool {
        match self {
            Self::CalendarDay => start.date() >= now.date(),
            Self::CalendarWeek => start.iso_week() == now.iso_week() || now < start,
            Self::Rolling(len) => start
                .checked_add_signed(*len)
                .is_none_or(|end| now < end),
        }
    }
}

impl From<WindowKind> for Window {
    fn from(kind: WindowKind) -> Self {
        match kind {
            WindowKind::CalendarDay => Self::CalendarDay,
            WindowKind::CalendarWeek => Self::CalendarWeek,
            WindowKind::Rolling { secs } => Self::Rolling(super::duration_secs(secs)),
        }
    }
}
