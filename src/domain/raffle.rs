//! Black Medal raffle: eligibility, status messages and guidance.

use alloy::primitives::Address;
use serde::Serialize;

/// Streak length assumed when the raffle contract cannot be read.
pub const DEFAULT_MINIMUM_STREAK: u32 = 7;

/// Raffle state for one collector as read from the raffle contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RaffleSnapshot {
    /// Collector is entered in the current round.
    pub is_participant: bool,
    /// Entrants in the current round.
    pub participant_count: u64,
    /// Current round number.
    pub current_round: u64,
    /// Streak required to enter.
    pub minimum_streak: u32,
    /// Raffle is paused.
    pub is_frozen: bool,
}

/// Evaluated raffle status for one collector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RaffleStatus {
    /// Streak requirement met and raffle open.
    pub is_eligible: bool,
    /// Already entered this round.
    pub is_entered: bool,
    /// Current streak in days.
    pub current_streak: u32,
    /// Streak required to enter.
    pub minimum_streak_required: u32,
    /// Fraction of the requirement met, capped at 1.
    pub streak_progress: f64,
    /// Days still missing.
    pub days_to_eligibility: u32,
    /// Current round number.
    pub current_round: u64,
    /// Entrants in the current round.
    pub participant_count: u64,
    /// Raffle is paused.
    pub is_frozen: bool,
    /// Human-readable summary.
    pub status_message: String,
    /// Entering is possible right now.
    pub can_enter: bool,
    /// Set when the snapshot could not be read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RaffleStatus {
    /// Evaluates `snapshot` against the collector's current streak.
    #[must_use]
    pub fn evaluate(snapshot: &RaffleSnapshot, current_streak: u32) -> Self {
        let minimum = snapshot.minimum_streak;
        let is_eligible = current_streak >= minimum && !snapshot.is_frozen;
        let is_entered = snapshot.is_participant;
        Self {
            is_eligible,
            is_entered,
            current_streak,
            minimum_streak_required: minimum,
            streak_progress: streak_progress(current_streak, minimum),
            days_to_eligibility: minimum.saturating_sub(current_streak),
            current_round: snapshot.current_round,
            participant_count: snapshot.participant_count,
            is_frozen: snapshot.is_frozen,
            status_message: status_message(
                is_eligible,
                is_entered,
                current_streak,
                minimum,
                snapshot.is_frozen,
            ),
            can_enter: is_eligible && !is_entered,
            error: None,
        }
    }

    /// Placeholder status used when the raffle cannot be read.
    #[must_use]
    pub fn unavailable(current_streak: u32, reason: impl Into<String>) -> Self {
        Self {
            is_eligible: false,
            is_entered: false,
            current_streak,
            minimum_streak_required: DEFAULT_MINIMUM_STREAK,
            streak_progress: streak_progress(current_streak, DEFAULT_MINIMUM_STREAK),
            days_to_eligibility: DEFAULT_MINIMUM_STREAK.saturating_sub(current_streak),
            current_round: 0,
            participant_count: 0,
            is_frozen: false,
            status_message: "Unable to fetch raffle status".to_string(),
            can_enter: false,
            error: Some(reason.into()),
        }
    }

    /// Next streak milestone worth pointing at.
    #[must_use]
    pub fn next_milestone(&self) -> Milestone {
        if self.is_eligible {
            Milestone {
                target: "Black Medal Raffle Entry".to_string(),
                days_remaining: 0,
                achieved: true,
            }
        } else {
            Milestone {
                target: format!("{}-day streak", self.minimum_streak_required),
                days_remaining: self.days_to_eligibility,
                achieved: false,
            }
        }
    }

    /// What the collector should do next.
    #[must_use]
    pub fn recommendation(&self) -> Recommendation {
        if self.is_frozen {
            Recommendation::Wait
        } else if self.can_enter {
            Recommendation::EnterRaffle
        } else if self.is_entered {
            Recommendation::AwaitDraw
        } else {
            Recommendation::KeepSpinning {
                days_remaining: self.days_to_eligibility,
            }
        }
    }
}

fn streak_progress(current: u32, minimum: u32) -> f64 {
    if minimum == 0 {
        1.0
    } else {
        (f64::from(current) / f64::from(minimum)).min(1.0)
    }
}

fn status_message(
    is_eligible: bool,
    is_entered: bool,
    current_streak: u32,
    minimum: u32,
    is_frozen: bool,
) -> String {
    if is_frozen {
        return "Raffle is currently paused".to_string();
    }
    if is_entered {
        return "You're in the current raffle - check Shape for results".to_string();
    }
    if is_eligible {
        return "Eligible for Black Medal raffle - visit Shape to enter".to_string();
    }
    if current_streak == 0 {
        return format!("Need {minimum} consecutive days to enter Black Medal raffle");
    }
    let left = minimum.saturating_sub(current_streak);
    let plural = if left == 1 { "" } else { "s" };
    format!(
        "{left} more day{plural} needed for Black Medal raffle ({current_streak}/{minimum})"
    )
}

/// Next streak target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Milestone {
    /// Target description.
    pub target: String,
    /// Days left to reach it.
    pub days_remaining: u32,
    /// Already reached.
    pub achieved: bool,
}

/// Suggested next action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Recommendation {
    /// Raffle is paused.
    Wait,
    /// Eligible and not yet entered.
    EnterRaffle,
    /// Entered; wait for the draw.
    AwaitDraw,
    /// Keep the streak going.
    KeepSpinning {
        /// Days still missing.
        days_remaining: u32,
    },
}

impl Recommendation {
    /// Human-readable advice.
    #[must_use]
    pub fn message(self) -> String {
        match self {
            Self::Wait => "Raffle is paused; keep your streak alive".to_string(),
            Self::EnterRaffle => "Enter the Black Medal raffle on Shape".to_string(),
            Self::AwaitDraw => "You're entered; wait for the draw".to_string(),
            Self::KeepSpinning { days_remaining } => {
                format!("Keep spinning daily: {days_remaining} more day(s) to qualify")
            }
        }
    }
}

/// Winner of a past round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RaffleWinner {
    /// Round number.
    pub round: u64,
    /// Winning collector.
    pub winner: Address,
}

/// The `count` most recent completed rounds before `current_round`,
/// oldest first.
#[must_use]
pub fn recent_rounds(current_round: u64, count: u64) -> Vec<u64> {
    if current_round == 0 {
        return Vec::new();
    }
    let first = current_round.saturating_sub(count).saturating_add(1).max(1);
    (first..current_round).collect()
}

/// Drops rounds without a winner.
#[must_use]
pub fn completed_winners(results: impl IntoIterator<Item = (u64, Address)>) -> Vec<RaffleWinner> {
    results
        .into_iter()
        .filter(|(_, winner)| !winner.is_zero())
        .map(|(round, winner)| RaffleWinner { round, winner })
        .collect()
}

/// Draw timing is set manually by the raffle operators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DrawTiming {
    /// A schedule is published.
    pub is_scheduled: bool,
    /// Next draw, when known.
    pub next_draw_time: Option<i64>,
    /// Explanation.
    pub message: String,
}

impl DrawTiming {
    /// The only timing the chain exposes: none.
    #[must_use]
    pub fn unscheduled() -> Self {
        Self {
            is_scheduled: false,
            next_draw_time: None,
            message: "Draw timing is determined by Shape team - no public schedule available"
                .to_string(),
        }
    }
}
