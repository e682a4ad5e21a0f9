//! Shared DTO pieces: timestamps rendered for the dashboard.
//!
//! Every instant goes out three ways: UNIX seconds, milliseconds for
//! JavaScript clients, and wall-clock text in the display timezone.

use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use utoipa::ToSchema;

/// A point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct TimeDto {
    /// UNIX seconds.
    pub timestamp: i64,
    /// UNIX milliseconds.
    pub timestamp_ms: i64,
    /// Local date and time, e.g. `09/04/25, 1:20:00 PM EDT`.
    pub local: String,
}

impl TimeDto {
    /// Renders `ts` in `tz`.
    #[must_use]
    pub fn new(ts: i64, tz: Tz) -> Self {
        Self {
            timestamp: ts,
            timestamp_ms: ts.saturating_mul(1_000),
            local: format_local(ts, tz, "%m/%d/%y, %-I:%M:%S %p %Z"),
        }
    }
}

fn zoned(ts: i64, tz: Tz) -> Option<DateTime<Tz>> {
    Utc.timestamp_opt(ts, 0).single().map(|dt| dt.with_timezone(&tz))
}

/// Formats `ts` in `tz` with a strftime pattern; out-of-range values fall
/// back to the raw number.
#[must_use]
pub fn format_local(ts: i64, tz: Tz, pattern: &str) -> String {
    zoned(ts, tz).map_or_else(|| ts.to_string(), |dt| dt.format(pattern).to_string())
}

/// `Sep 4, 2025` style date.
#[must_use]
pub fn format_date(ts: i64, tz: Tz) -> String {
    format_local(ts, tz, "%b %-d, %Y")
}

/// `1:20 PM EDT` style clock time.
#[must_use]
pub fn format_clock(ts: i64, tz: Tz) -> String {
    format_local(ts, tz, "%-I:%M %p %Z")
}

/// `5h 3m`, `42m` or `now`.
#[must_use]
pub fn format_countdown(seconds: i64) -> String {
    if seconds <= 0 {
        return "now".to_string();
    }
    let hours = seconds / 3_600;
    let minutes = (seconds % 3_600).div_euclid(60);
    match (hours, minutes) {
        (0, 0) => format!("{seconds}s"),
        (0, m) => format!("{m}m"),
        (h, m) => format!("{h}h {m}m"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::America::New_York;

    #[test]
    fn renders_eastern_time() {
        let t = TimeDto::new(1_757_006_400, New_York);
        assert_eq!(t.timestamp_ms, 1_757_006_400_000);
        assert_eq!(t.local, "09/04/25, 1:20:00 PM EDT");
        assert_eq!(format_date(1_757_006_400, New_York), "Sep 4, 2025");
        assert_eq!(format_clock(1_757_006_400, New_York), "1:20 PM EDT");
    }

    #[test]
    fn countdown_text() {
        assert_eq!(format_countdown(0), "now");
        assert_eq!(format_countdown(45), "45s");
        assert_eq!(format_countdown(42 * 60 + 5), "42m");
        assert_eq!(format_countdown(5 * 3_600 + 3 * 60), "5h 3m");
    }
}
