//! Spin scheduling: eligibility, next eligible time, and the phase view.
//!
//! Everything here is a pure function of an event snapshot and an explicit
//! `now`. Callers own caching and clocks; these functions own no state and
//! need no locking.
//!
//! ```text
//!  NO_HISTORY ──────────────► ELIGIBLE ◄──────────────┐
//!                                │                     │
//!                      new spin  │     now - last >= 24h
//!                                ▼                     │
//!                           COOLING_DOWN ──────────────┘
//! ```

use serde::Serialize;

use super::spin_event::{SpinEvent, UnixSeconds, last_spin, spin_count};

/// Minimum time between two spins.
pub const SPIN_COOLDOWN_SECS: i64 = 24 * 60 * 60;

const MINUTE_SECS: i64 = 60;

/// Returns `true` when a new spin is permitted at `now`.
///
/// Empty history is always eligible. Eligibility never expires once the
/// cooldown has elapsed. A `now` earlier than the last spin is clamped to
/// the last spin, so skewed clocks read as "just spun".
#[must_use]
pub fn can_spin_now(events: &[SpinEvent], now: UnixSeconds) -> bool {
    match last_spin(events) {
        None => true,
        Some(last) => now.max(last) - last >= SPIN_COOLDOWN_SECS,
    }
}

/// When the next spin becomes available.
///
/// `now` for empty history, otherwise `last + cooldown` rounded up to the
/// next whole minute.
#[must_use]
pub fn next_eligible_time(events: &[SpinEvent], now: UnixSeconds) -> UnixSeconds {
    match last_spin(events) {
        None => now,
        Some(last) => round_up_to_minute(last.saturating_add(SPIN_COOLDOWN_SECS)),
    }
}

/// Advances `ts` to the start of the next minute unless it already sits on
/// a minute boundary.
#[must_use]
pub const fn round_up_to_minute(ts: UnixSeconds) -> UnixSeconds {
    round_up_to(ts, MINUTE_SECS)
}

const fn round_up_to(ts: UnixSeconds, step: i64) -> UnixSeconds {
    let rem = ts.rem_euclid(step);
    if rem == 0 { ts } else { ts.saturating_add(step - rem) }
}

/// Coarse lifecycle of a collector's spin schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpinPhase {
    /// No spin was ever recorded.
    NoHistory,
    /// Last spin is younger than the cooldown.
    CoolingDown,
    /// The cooldown elapsed; a spin is available.
    Eligible,
}

impl SpinPhase {
    /// Classifies an event snapshot at `now`.
    #[must_use]
    pub fn classify(events: &[SpinEvent], now: UnixSeconds) -> Self {
        if last_spin(events).is_none() {
            Self::NoHistory
        } else if can_spin_now(events, now) {
            Self::Eligible
        } else {
            Self::CoolingDown
        }
    }
}

/// Derived schedule view, recomputed on every query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScheduleState {
    /// Number of well-formed spins.
    pub spin_count: usize,
    /// Most recent spin, if any.
    pub last_spin_timestamp: Option<UnixSeconds>,
    /// When the next spin becomes available. At or before `now` exactly
    /// when `can_spin_now` holds.
    pub next_eligible_timestamp: UnixSeconds,
    /// Whether a spin is permitted right now.
    pub can_spin_now: bool,
    /// Phase of the schedule state machine.
    pub phase: SpinPhase,
}

impl ScheduleState {
    /// Computes the schedule view for `events` at `now`.
    ///
    /// While eligible the minute-rounded target may still lie a few seconds
    /// ahead of `now`; it is clamped to `now` so the reported time never
    /// claims the spin is in the future when it is not.
    #[must_use]
    pub fn compute(events: &[SpinEvent], now: UnixSeconds) -> Self {
        let last_spin_timestamp = last_spin(events);
        let can_spin_now = can_spin_now(events, now);
        let target = next_eligible_time(events, now);
        let next_eligible_timestamp = if can_spin_now { target.min(now) } else { target };

        Self {
            spin_count: spin_count(events),
            last_spin_timestamp,
            next_eligible_timestamp,
            can_spin_now,
            phase: SpinPhase::classify(events, now),
        }
    }

    /// Seconds until the next spin; zero once eligible.
    #[must_use]
    pub fn seconds_until_eligible(&self, now: UnixSeconds) -> i64 {
        if self.can_spin_now {
            0
        } else {
            (self.next_eligible_timestamp - now).max(0)
        }
    }

    /// Whether a cached event list for this collector must be dropped.
    ///
    /// Once eligible after at least one cooldown, a new spin may land at
    /// any moment and cached history is no longer authoritative.
    #[must_use]
    pub const fn requires_refresh(&self) -> bool {
        matches!(self.phase, SpinPhase::Eligible)
    }
}

/// Poll cadence suggested to dashboards, in seconds.
///
/// Tightens as eligibility approaches and relaxes when the next spin is
/// hours away.
#[must_use]
pub fn suggested_poll_interval_secs(state: &ScheduleState, now: UnixSeconds) -> u64 {
    match state.phase {
        SpinPhase::NoHistory => 120,
        SpinPhase::Eligible => 30,
        SpinPhase::CoolingDown => match state.next_eligible_timestamp - now {
            left if left < 0 => 30,
            left if left < 5 * 60 => 20,
            left if left < 30 * 60 => 60,
            left if left < 2 * 60 * 60 => 120,
            _ => 300,
        },
    }
}

/// The cron tick at which a notification for `next_eligible` goes out.
///
/// Rounds up to the next multiple of `cron_interval_minutes`. A zero
/// interval is treated as one minute.
#[must_use]
pub fn notification_slot(next_eligible: UnixSeconds, cron_interval_minutes: u32) -> UnixSeconds {
    let step = i64::from(cron_interval_minutes.max(1)) * MINUTE_SECS;
    round_up_to(next_eligible, step)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use alloy::primitives::{B256, U256};
    use proptest::prelude::*;

    const T: i64 = 1_757_000_000;
    const HOUR: i64 = 3_600;

    fn at(ts: i64) -> SpinEvent {
        SpinEvent::new(B256::ZERO, ts)
    }

    #[test]
    fn empty_history_is_eligible_now() {
        let state = ScheduleState::compute(&[], T);
        assert!(state.can_spin_now);
        assert_eq!(state.next_eligible_timestamp, T);
        assert_eq!(state.phase, SpinPhase::NoHistory);
        assert_eq!(state.spin_count, 0);
        assert_eq!(state.last_spin_timestamp, None);
    }

    #[test]
    fn cooling_down_after_23_hours() {
        let events = [at(T)];
        let state = ScheduleState::compute(&events, T + 23 * HOUR);
        assert!(!state.can_spin_now);
        assert_eq!(state.phase, SpinPhase::CoolingDown);
        // T is 20s past a minute boundary.
        assert_eq!(T % 60, 20);
        assert_eq!(state.next_eligible_timestamp, T + 24 * HOUR + 40);
        assert_eq!(state.seconds_until_eligible(T + 23 * HOUR), HOUR + 40);
    }

    #[test]
    fn eligible_after_25_hours() {
        let state = ScheduleState::compute(&[at(T)], T + 25 * HOUR);
        assert!(state.can_spin_now);
        assert_eq!(state.phase, SpinPhase::Eligible);
        assert!(state.requires_refresh());
    }

    #[test]
    fn exactly_one_cooldown_is_eligible() {
        assert!(can_spin_now(&[at(T)], T + SPIN_COOLDOWN_SECS));
        assert!(!can_spin_now(&[at(T)], T + SPIN_COOLDOWN_SECS - 1));
    }

    #[test]
    fn eligible_inside_rounding_window_reports_now() {
        let now = T + SPIN_COOLDOWN_SECS + 5;
        let state = ScheduleState::compute(&[at(T)], now);
        assert!(state.can_spin_now);
        assert_eq!(state.next_eligible_timestamp, now);
        assert!(state.next_eligible_timestamp >= T + SPIN_COOLDOWN_SECS);
    }

    #[test]
    fn uses_maximum_not_last_element() {
        let events = [at(T + 10 * HOUR), at(T)];
        assert!(!can_spin_now(&events, T + 25 * HOUR));
        assert!(can_spin_now(&events, T + 34 * HOUR));
    }

    #[test]
    fn malformed_events_are_skipped() {
        let events = [at(-1), at(T)];
        let state = ScheduleState::compute(&events, T + HOUR);
        assert_eq!(state.spin_count, 1);
        assert_eq!(state.last_spin_timestamp, Some(T));

        let only_bad = [at(-50)];
        assert_eq!(SpinPhase::classify(&only_bad, T), SpinPhase::NoHistory);
    }

    #[test]
    fn far_future_timestamps_saturate() {
        let events: Vec<SpinEvent> = SpinEvent::from_raw(B256::ZERO, U256::from(i64::MAX.unsigned_abs()))
            .into_iter()
            .collect();
        assert_eq!(events.len(), 1);

        let state = ScheduleState::compute(&events, T);
        assert!(!state.can_spin_now);
        assert_eq!(state.next_eligible_timestamp, i64::MAX);
        assert_eq!(state.seconds_until_eligible(T), i64::MAX - T);
        assert_eq!(suggested_poll_interval_secs(&state, T), 300);
        assert_eq!(notification_slot(state.next_eligible_timestamp, 10), i64::MAX);
    }

    #[test]
    fn clock_skew_reads_as_just_spun() {
        let state = ScheduleState::compute(&[at(T)], T - HOUR);
        assert!(!state.can_spin_now);
        assert_eq!(state.seconds_until_eligible(T - HOUR), 25 * HOUR + 40);
    }

    #[test]
    fn round_up_keeps_boundaries() {
        assert_eq!(round_up_to_minute(120), 120);
        assert_eq!(round_up_to_minute(121), 180);
        assert_eq!(round_up_to_minute(179), 180);
    }

    #[test]
    fn poll_interval_tightens_near_eligibility() {
        let events = [at(T)];
        let eligible_at = next_eligible_time(&events, T);
        let poll = |now: i64| {
            suggested_poll_interval_secs(&ScheduleState::compute(&events, now), now)
        };
        assert_eq!(poll(eligible_at - 3 * HOUR), 300);
        assert_eq!(poll(eligible_at - HOUR), 120);
        assert_eq!(poll(eligible_at - 10 * 60), 60);
        assert_eq!(poll(eligible_at - 60), 20);
        assert_eq!(poll(eligible_at + 60), 30);
        assert_eq!(
            suggested_poll_interval_secs(&ScheduleState::compute(&[], T), T),
            120
        );
    }

    #[test]
    fn notification_slot_rounds_to_cron_tick() {
        // hh:03:20 with a 10-minute cron fires at hh:10:00.
        let base = 1_757_001_600;
        assert_eq!(notification_slot(base + 200, 10), base + 600);
        assert_eq!(notification_slot(base, 10), base);
        assert_eq!(notification_slot(base + 1, 0), base + 60);
    }

    proptest! {
        #[test]
        fn empty_is_always_eligible(now in 0_i64..4_000_000_000) {
            prop_assert!(can_spin_now(&[], now));
            prop_assert_eq!(next_eligible_time(&[], now), now);
        }

        #[test]
        fn eligibility_matches_elapsed(last in 0_i64..3_000_000_000, elapsed in 0_i64..400_000) {
            let events = [at(last)];
            prop_assert_eq!(can_spin_now(&events, last + elapsed), elapsed >= SPIN_COOLDOWN_SECS);
        }

        #[test]
        fn eligibility_is_permanent(last in 0_i64..3_000_000_000, extra in 0_i64..100_000_000) {
            let events = [at(last)];
            let now = last + SPIN_COOLDOWN_SECS;
            prop_assert!(can_spin_now(&events, now));
            prop_assert!(can_spin_now(&events, now + extra));
        }

        #[test]
        fn state_invariants_hold(
            stamps in proptest::collection::vec(0_i64..3_000_000_000, 0..8),
            offset in -200_000_i64..400_000,
        ) {
            let events: Vec<SpinEvent> = stamps.iter().copied().map(at).collect();
            let base = stamps.iter().copied().max().unwrap_or(1_000_000);
            let now = base + offset;
            let state = ScheduleState::compute(&events, now);
            if let Some(last) = state.last_spin_timestamp {
                prop_assert!(state.next_eligible_timestamp >= last + SPIN_COOLDOWN_SECS);
            }
            prop_assert_eq!(state.next_eligible_timestamp <= now, state.can_spin_now);
            prop_assert_eq!(state, ScheduleState::compute(&events, now));
        }

        #[test]
        fn order_does_not_matter(stamps in proptest::collection::vec(0_i64..3_000_000_000, 1..8), now in 0_i64..3_100_000_000) {
            let forward: Vec<SpinEvent> = stamps.iter().copied().map(at).collect();
            let mut backward = forward.clone();
            backward.reverse();
            prop_assert_eq!(ScheduleState::compute(&forward, now), ScheduleState::compute(&backward, now));
        }
    }
}
