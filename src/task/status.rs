//! Deadline status derivation.
//!
//! [`evaluate`] is a pure function of the deadline, the completion flag and
//! the current time. It never looks at a previously derived label, so calling
//! it every tick cannot accumulate drift.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::fmt;

use super::deadline::Deadline;

/// Remaining time at or below which a per-second countdown is shown.
pub const COUNTDOWN_WINDOW_MS: i64 = 60_000;

const NANOS_PER_MILLI: i64 = 1_000_000;
const NANOS_PER_SECOND: i64 = 1_000_000_000;

const MINUTES_IN_DAY: i64 = 1_440;
const MINUTES_IN_ALMOST_TWO_DAYS: i64 = 2_520;
const MINUTES_IN_MONTH: i64 = 43_200;
const MINUTES_IN_TWO_MONTHS: i64 = 86_400;

/// Display status of a task at a given instant.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum StatusLabel {
    /// No deadline set; never counts down.
    #[default]
    NoDeadline,
    /// Marked complete. Terminal.
    Completed,
    /// Deadline reached (or unreadable) without completion.
    Expired,
    /// Whole seconds left, rounded up. Only within the last minute.
    CountdownSeconds(u32),
    /// Coarse future distance such as "in about 3 hours".
    Relative(String),
}

impl StatusLabel {
    /// Labels that no passage of time can change.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Expired)
    }

    pub fn countdown(&self) -> Option<u32> {
        match self {
            Self::CountdownSeconds(secs) => Some(*secs),
            _ => None,
        }
    }
}

impl fmt::Display for StatusLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoDeadline => write!(f, "no deadline"),
            Self::Completed => write!(f, "completed"),
            Self::Expired => write!(f, "expired"),
            Self::CountdownSeconds(1) => write!(f, "1 second left"),
            Self::CountdownSeconds(secs) => write!(f, "{} seconds left", secs),
            Self::Relative(text) => f.write_str(text),
        }
    }
}

/// Derive the display status for a task.
///
/// Completion wins over everything. A missing deadline never expires, while a
/// deadline whose text could not be parsed is treated as already passed.
pub fn evaluate(deadline: Option<&Deadline>, completed: bool, now: DateTime<Utc>) -> StatusLabel {
    if completed {
        return StatusLabel::Completed;
    }
    let Some(deadline) = deadline else {
        return StatusLabel::NoDeadline;
    };
    let Some(at) = deadline.instant() else {
        return StatusLabel::Expired;
    };

    let remaining = at - now;
    if remaining <= Duration::zero() {
        StatusLabel::Expired
    } else if remaining <= Duration::milliseconds(COUNTDOWN_WINDOW_MS) {
        // Inside the window the nanosecond count always fits in an i64.
        let nanos = remaining
            .num_nanoseconds()
            .unwrap_or(COUNTDOWN_WINDOW_MS * NANOS_PER_MILLI);
        let secs = (nanos + NANOS_PER_SECOND - 1) / NANOS_PER_SECOND;
        StatusLabel::CountdownSeconds(secs as u32)
    } else {
        StatusLabel::Relative(humanize_future(remaining))
    }
}

/// Future-oriented distance phrase, e.g. `in about 2 hours`.
pub fn humanize_future(remaining: Duration) -> String {
    format!("in {}", humanize_distance(remaining))
}

/// Coarse distance ladder: minutes, hours, days, months, years.
///
/// Months are fixed 30-day spans; year phrasing works from whole months.
pub fn humanize_distance(distance: Duration) -> String {
    let seconds = distance.num_seconds().abs();
    let minutes = round_div(seconds, 60);

    if minutes < 1 {
        return "less than a minute".to_string();
    }
    if minutes < 45 {
        return plural(minutes, "minute");
    }
    if minutes < 90 {
        return "about 1 hour".to_string();
    }
    if minutes < MINUTES_IN_DAY {
        let hours = round_div(minutes, 60);
        return format!("about {}", plural(hours, "hour"));
    }
    if minutes < MINUTES_IN_ALMOST_TWO_DAYS {
        return "1 day".to_string();
    }
    if minutes < MINUTES_IN_MONTH {
        let days = round_div(minutes, MINUTES_IN_DAY);
        return plural(days, "day");
    }
    if minutes < MINUTES_IN_TWO_MONTHS {
        let months = round_div(minutes, MINUTES_IN_MONTH);
        return format!("about {}", plural(months, "month"));
    }

    let months = minutes / MINUTES_IN_MONTH;
    if months < 12 {
        let nearest = round_div(minutes, MINUTES_IN_MONTH);
        return plural(nearest, "month");
    }

    let years = months / 12;
    let leftover = months % 12;
    if leftover < 3 {
        format!("about {}", plural(years, "year"))
    } else if leftover < 9 {
        format!("over {}", plural(years, "year"))
    } else {
        format!("almost {}", plural(years + 1, "year"))
    }
}

fn round_div(value: i64, divisor: i64) -> i64 {
    (value as f64 / divisor as f64).round() as i64
}

fn plural(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("1 {}", unit)
    } else {
        format!("{} {}s", count, unit)
    }
}
