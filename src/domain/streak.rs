//! Consecutive-day streak under the 48-hour rolling-gap rule.
//!
//! The streak counts back from the newest spin and stops at the first pair
//! of adjacent spins more than [`StreakPolicy::max_gap_secs`] apart. A
//! streak whose newest spin is itself older than the gap is zero. Adjacent
//! spins that fall in the same day bucket do not lengthen the streak.

use serde::{Deserialize, Serialize};

use super::spin_event::{SpinEvent, UnixSeconds, valid_timestamps};

/// Default break threshold: one missed cooldown cycle is tolerated.
pub const DEFAULT_STREAK_GAP_SECS: i64 = 48 * 60 * 60;

const DAY_SECS: i64 = 24 * 60 * 60;

/// A live streak within this long of breaking is flagged at risk.
pub const STREAK_RISK_WINDOW_SECS: i64 = 12 * 60 * 60;

/// Day-boundary and gap settings for streak counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakPolicy {
    /// Largest gap between adjacent spins that keeps a streak alive.
    pub max_gap_secs: i64,
    /// Offset of the reference day boundary from UTC midnight, in seconds
    /// east of UTC (e.g. `-18000` for a UTC-5 business day).
    pub day_offset_secs: i64,
}

impl Default for StreakPolicy {
    fn default() -> Self {
        Self {
            max_gap_secs: DEFAULT_STREAK_GAP_SECS,
            day_offset_secs: 0,
        }
    }
}

impl StreakPolicy {
    /// Calendar day index of `ts` in the reference timezone.
    #[must_use]
    pub const fn day_bucket(&self, ts: UnixSeconds) -> i64 {
        ts.saturating_add(self.day_offset_secs).div_euclid(DAY_SECS)
    }

    /// Current streak length in days for `events` at `now`.
    #[must_use]
    pub fn current_streak(&self, events: &[SpinEvent], now: UnixSeconds) -> u32 {
        let mut stamps: Vec<UnixSeconds> = valid_timestamps(events).collect();
        stamps.sort_unstable_by(|a, b| b.cmp(a));

        let Some(&newest) = stamps.first() else {
            return 0;
        };
        if now.max(newest) - newest > self.max_gap_secs {
            return 0;
        }

        let mut streak: u32 = 1;
        for pair in stamps.windows(2) {
            let [later, earlier] = pair else { break };
            if later - earlier > self.max_gap_secs {
                break;
            }
            if self.day_bucket(*later) != self.day_bucket(*earlier) {
                streak = streak.saturating_add(1);
            }
        }
        streak
    }

    /// `true` when one more spin before `now + max_gap` keeps the streak.
    #[must_use]
    pub fn is_at_risk(&self, events: &[SpinEvent], now: UnixSeconds, within_secs: i64) -> bool {
        match valid_timestamps(events).max() {
            Some(newest) => {
                let deadline = newest.saturating_add(self.max_gap_secs);
                deadline >= now && deadline - now <= within_secs
            }
            None => false,
        }
    }
}

/// Derived streak view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StreakState {
    /// Consecutive days of spin activity; 0 once broken.
    pub current_streak_days: u32,
    /// The streak breaks within [`STREAK_RISK_WINDOW_SECS`] without a spin.
    pub at_risk: bool,
}

impl StreakState {
    /// Computes the streak for `events` at `now` under `policy`.
    #[must_use]
    pub fn compute(policy: &StreakPolicy, events: &[SpinEvent], now: UnixSeconds) -> Self {
        Self {
            current_streak_days: policy.current_streak(events, now),
            at_risk: policy.is_at_risk(events, now, STREAK_RISK_WINDOW_SECS),
        }
    }
}
