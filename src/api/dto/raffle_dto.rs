//! Black Medal raffle DTOs.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::common_dto::TimeDto;
use crate::domain::raffle::{DrawTiming, Milestone, RaffleStatus, RaffleWinner, Recommendation};
use crate::service::RaffleInfo;

/// Query for `GET /api/v1/raffle`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RaffleQuery {
    /// Collector address or `.eth` name; defaults to the home collector.
    pub address: Option<String>,
}

/// Raffle eligibility of one collector.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RaffleStatusDto {
    /// Streak meets the minimum and the raffle is open.
    pub is_eligible: bool,
    /// Already in the current round.
    pub is_entered: bool,
    /// Eligible and not yet entered.
    pub can_enter: bool,
    /// Current streak in days.
    pub current_streak: u32,
    /// Streak required to enter.
    pub minimum_streak_required: u32,
    /// Progress toward the minimum, 0.0 to 1.0.
    pub streak_progress: f64,
    /// Days still missing.
    pub days_to_eligibility: u32,
    /// Current round.
    pub current_round: u64,
    /// Entrants in the current round.
    pub participant_count: u64,
    /// Entries are paused.
    pub is_frozen: bool,
    /// Status text.
    pub status_message: String,
    /// Why the status could not be read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&RaffleStatus> for RaffleStatusDto {
    fn from(s: &RaffleStatus) -> Self {
        Self {
            is_eligible: s.is_eligible,
            is_entered: s.is_entered,
            can_enter: s.can_enter,
            current_streak: s.current_streak,
            minimum_streak_required: s.minimum_streak_required,
            streak_progress: s.streak_progress,
            days_to_eligibility: s.days_to_eligibility,
            current_round: s.current_round,
            participant_count: s.participant_count,
            is_frozen: s.is_frozen,
            status_message: s.status_message.clone(),
            error: s.error.clone(),
        }
    }
}

/// Next streak milestone.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MilestoneDto {
    /// What to aim for.
    pub target: String,
    /// Days left.
    pub days_remaining: u32,
    /// Already reached.
    pub achieved: bool,
}

impl From<Milestone> for MilestoneDto {
    fn from(m: Milestone) -> Self {
        Self {
            target: m.target,
            days_remaining: m.days_remaining,
            achieved: m.achieved,
        }
    }
}

/// Suggested next action.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecommendationDto {
    /// `wait`, `enter_raffle`, `await_draw` or `keep_spinning`.
    pub action: String,
    /// Advice text.
    pub message: String,
    /// Days left, for `keep_spinning`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_remaining: Option<u32>,
}

impl From<Recommendation> for RecommendationDto {
    fn from(r: Recommendation) -> Self {
        let (action, days_remaining) = match r {
            Recommendation::Wait => ("wait", None),
            Recommendation::EnterRaffle => ("enter_raffle", None),
            Recommendation::AwaitDraw => ("await_draw", None),
            Recommendation::KeepSpinning { days_remaining } => ("keep_spinning", Some(days_remaining)),
        };
        Self {
            action: action.to_string(),
            message: r.message(),
            days_remaining,
        }
    }
}

/// Winner of a past round.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WinnerDto {
    /// Round number.
    pub round: u64,
    /// Winning address, checksummed.
    pub winner: String,
}

impl From<&RaffleWinner> for WinnerDto {
    fn from(w: &RaffleWinner) -> Self {
        Self {
            round: w.round,
            winner: w.winner.to_string(),
        }
    }
}

/// Draw schedule.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DrawDto {
    /// A schedule is published.
    pub is_scheduled: bool,
    /// Next draw.
    pub next_draw: Option<TimeDto>,
    /// Explanation.
    pub message: String,
}

impl DrawDto {
    fn new(draw: &DrawTiming, tz: Tz) -> Self {
        Self {
            is_scheduled: draw.is_scheduled,
            next_draw: draw.next_draw_time.map(|ts| TimeDto::new(ts, tz)),
            message: draw.message.clone(),
        }
    }
}

/// Response for `GET /api/v1/raffle`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RaffleResponse {
    /// Collector address, checksummed.
    pub address: String,
    /// Eligibility.
    pub status: RaffleStatusDto,
    /// Next milestone.
    pub next_milestone: MilestoneDto,
    /// Suggested action.
    pub recommendation: RecommendationDto,
    /// Recent winners, newest first.
    pub recent_winners: Vec<WinnerDto>,
    /// Draw schedule.
    pub draw: DrawDto,
}

impl RaffleResponse {
    /// Renders a service result.
    #[must_use]
    pub fn new(info: &RaffleInfo, tz: Tz) -> Self {
        Self {
            address: info.address.to_string(),
            status: RaffleStatusDto::from(&info.status),
            next_milestone: info.next_milestone.clone().into(),
            recommendation: info.recommendation.into(),
            recent_winners: info.recent_winners.iter().map(WinnerDto::from).collect(),
            draw: DrawDto::new(&info.draw, tz),
        }
    }
}
