//! Schedule-only and change-check DTOs.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::common_dto::TimeDto;
use super::status_dto::{ScheduleDto, StreakDto};
use crate::service::{ScheduleView, UpdateCheck};

/// Response for `GET /api/v1/schedule`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ScheduleResponse {
    /// Collector address, checksummed.
    pub address: String,
    /// Schedule.
    pub schedule: ScheduleDto,
    /// Streak.
    pub streak: StreakDto,
    /// Cron tick that sends the next "spin ready" text.
    pub notification_slot: Option<TimeDto>,
    /// Poll cadence for the dashboard.
    pub suggested_poll_interval_secs: u64,
    /// Evaluation time.
    pub computed_at: TimeDto,
}

impl ScheduleResponse {
    /// Renders a service result.
    #[must_use]
    pub fn new(view: &ScheduleView, tz: Tz) -> Self {
        Self {
            address: view.address.to_string(),
            schedule: ScheduleDto::new(&view.schedule, view.computed_at, tz),
            streak: view.streak.into(),
            notification_slot: view.notification_slot.map(|ts| TimeDto::new(ts, tz)),
            suggested_poll_interval_secs: view.poll_interval_secs,
            computed_at: TimeDto::new(view.computed_at, tz),
        }
    }
}

/// Query for `GET /api/v1/updates`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UpdatesQuery {
    /// Spin count the client currently shows.
    pub known_spin_count: Option<usize>,
}

/// Response for `GET /api/v1/updates`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UpdatesResponse {
    /// Counted spins.
    pub spin_count: usize,
    /// Whether a spin is permitted now.
    pub can_spin_now: bool,
    /// Most recent counted spin.
    pub last_spin: Option<TimeDto>,
    /// The client should reload the full status.
    pub has_updates: bool,
    /// Poll cadence for the dashboard.
    pub suggested_poll_interval_secs: u64,
    /// Summary.
    pub message: String,
}

impl UpdatesResponse {
    /// Renders a service result.
    #[must_use]
    pub fn new(check: &UpdateCheck, tz: Tz) -> Self {
        Self {
            spin_count: check.spin_count,
            can_spin_now: check.can_spin_now,
            last_spin: check.last_spin_timestamp.map(|ts| TimeDto::new(ts, tz)),
            has_updates: check.has_updates,
            suggested_poll_interval_secs: check.poll_interval_secs,
            message: if check.can_spin_now {
                "Spin available!".to_string()
            } else {
                "Waiting for next spin".to_string()
            },
        }
    }
}
