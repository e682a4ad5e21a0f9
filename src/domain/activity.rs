//! Chronological activity history: numbered spins with their medals and
//! the gaps between them, plus raffle wins.

use serde::Serialize;

use super::medal::{Medal, MedalTier};
use super::spin_event::{SpinEvent, UnixSeconds};

/// Time between a spin and the previous counted spin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SpinGap {
    /// Total seconds.
    pub seconds: i64,
    /// Whole days.
    pub days: i64,
    /// Remaining hours.
    pub hours: i64,
    /// Remaining minutes.
    pub minutes: i64,
    /// The gap alone would break a streak.
    pub exceeds_streak_gap: bool,
}

impl SpinGap {
    /// Splits `seconds` into days, hours and minutes.
    #[must_use]
    pub const fn new(seconds: i64, max_streak_gap_secs: i64) -> Self {
        Self {
            seconds,
            days: seconds / 86_400,
            hours: (seconds % 86_400) / 3_600,
            minutes: (seconds % 3_600) / 60,
            exceeds_streak_gap: seconds > max_streak_gap_secs,
        }
    }
}

/// What happened at one point in a collector's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActivityKind {
    /// A counted spin.
    Spin {
        /// 1-based spin number.
        number: usize,
        /// Medal awarded for this spin, when known.
        medal: Option<Medal>,
        /// Gap to the previous counted spin.
        gap: Option<SpinGap>,
    },
    /// A spin record that does not count (see the override table).
    ExcludedSpin {
        /// Why it does not count.
        label: String,
    },
    /// A Black medal raffle win.
    RaffleWin {
        /// Tier awarded.
        tier: MedalTier,
    },
}

/// One history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Activity {
    /// UNIX seconds of the entry.
    pub timestamp: UnixSeconds,
    /// Entry payload.
    #[serde(flatten)]
    pub kind: ActivityKind,
}

/// Inputs to [`build_history`].
#[derive(Debug, Clone, Copy)]
pub struct HistoryInput<'a> {
    /// Spin records with raffle claims already removed.
    pub spins: &'a [SpinEvent],
    /// Decoded Medal Spin medals.
    pub medals: &'a [Medal],
    /// Spin timestamps that must not count.
    pub excluded_spins: &'a [UnixSeconds],
    /// Label for excluded spins.
    pub excluded_label: &'a str,
    /// Raffle wins that have no Black medal on record.
    pub extra_raffle_wins: &'a [UnixSeconds],
    /// Streak break threshold for gap flags.
    pub max_streak_gap_secs: i64,
}

/// Builds the activity history, newest first.
///
/// Spin-reward medals are assigned to counted spins in chronological order;
/// the n-th counted spin receives the n-th medal.
#[must_use]
pub fn build_history(input: &HistoryInput<'_>) -> Vec<Activity> {
    let mut spins: Vec<SpinEvent> = input
        .spins
        .iter()
        .filter(|s| s.is_well_formed())
        .copied()
        .collect();
    spins.sort_by_key(|s| s.timestamp);

    let mut rewards = input
        .medals
        .iter()
        .filter(|m| m.tier.is_spin_reward())
        .cloned()
        .collect::<Vec<_>>();
    rewards.sort_by_key(|m| m.timestamp);
    let mut rewards = rewards.into_iter();

    let mut history = Vec::with_capacity(spins.len() + input.extra_raffle_wins.len());
    let mut number = 0_usize;
    let mut previous: Option<UnixSeconds> = None;

    for spin in spins {
        if input.excluded_spins.contains(&spin.timestamp) {
            history.push(Activity {
                timestamp: spin.timestamp,
                kind: ActivityKind::ExcludedSpin {
                    label: input.excluded_label.to_string(),
                },
            });
            continue;
        }
        number += 1;
        let gap = previous.map(|prev| SpinGap::new(spin.timestamp - prev, input.max_streak_gap_secs));
        previous = Some(spin.timestamp);
        history.push(Activity {
            timestamp: spin.timestamp,
            kind: ActivityKind::Spin {
                number,
                medal: rewards.next(),
                gap,
            },
        });
    }

    let black_wins = input
        .medals
        .iter()
        .filter(|m| m.tier == MedalTier::Black)
        .map(|m| m.timestamp);
    for timestamp in black_wins.chain(input.extra_raffle_wins.iter().copied()) {
        history.push(Activity {
            timestamp,
            kind: ActivityKind::RaffleWin {
                tier: MedalTier::Black,
            },
        });
    }

    history.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    history
}
