//! Collector status DTOs: schedule, streak, medals and activity history.

use chrono_tz::Tz;
use serde::Serialize;
use utoipa::ToSchema;

use super::common_dto::{TimeDto, format_clock, format_countdown, format_date};
use super::raffle_dto::RaffleStatusDto;
use crate::domain::activity::{Activity, ActivityKind, SpinGap};
use crate::domain::collector::short_address;
use crate::domain::medal::{Medal, MedalStats};
use crate::domain::schedule::{ScheduleState, SpinPhase};
use crate::domain::streak::StreakState;
use crate::service::CollectorStatus;

/// Presentation settings applied while rendering.
#[derive(Debug, Clone)]
pub struct DisplayContext {
    /// Display timezone.
    pub tz: Tz,
    /// Masked notification recipient, when texts are enabled.
    pub recipient: Option<String>,
    /// Echoed to the dashboard.
    pub use_metamask_deeplink: bool,
}

/// Schedule section.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ScheduleDto {
    /// Counted spins.
    pub spin_count: usize,
    /// Number the next spin will get.
    pub next_spin_number: usize,
    /// Whether a spin is permitted now.
    pub can_spin_now: bool,
    /// `NO_HISTORY`, `COOLING_DOWN` or `ELIGIBLE`.
    pub phase: String,
    /// Most recent counted spin.
    pub last_spin: Option<TimeDto>,
    /// When the next spin becomes available.
    pub next_eligible: TimeDto,
    /// Seconds until then; zero once eligible.
    pub seconds_until_eligible: i64,
    /// Countdown text.
    pub time_until_eligible: String,
}

const fn phase_name(phase: SpinPhase) -> &'static str {
    match phase {
        SpinPhase::NoHistory => "NO_HISTORY",
        SpinPhase::CoolingDown => "COOLING_DOWN",
        SpinPhase::Eligible => "ELIGIBLE",
    }
}

impl ScheduleDto {
    /// Renders `schedule` as seen at `now`.
    #[must_use]
    pub fn new(schedule: &ScheduleState, now: i64, tz: Tz) -> Self {
        let seconds_until_eligible = schedule.seconds_until_eligible(now);
        Self {
            spin_count: schedule.spin_count,
            next_spin_number: schedule.spin_count + 1,
            can_spin_now: schedule.can_spin_now,
            phase: phase_name(schedule.phase).to_string(),
            last_spin: schedule.last_spin_timestamp.map(|ts| TimeDto::new(ts, tz)),
            next_eligible: TimeDto::new(schedule.next_eligible_timestamp, tz),
            seconds_until_eligible,
            time_until_eligible: format_countdown(seconds_until_eligible),
        }
    }
}

/// Streak section.
#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
pub struct StreakDto {
    /// Consecutive days of spin activity.
    pub current_streak_days: u32,
    /// One more missed day breaks the streak.
    pub at_risk: bool,
}

impl From<StreakState> for StreakDto {
    fn from(s: StreakState) -> Self {
        Self {
            current_streak_days: s.current_streak_days,
            at_risk: s.at_risk,
        }
    }
}

/// One medal.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MedalDto {
    /// Tier name.
    pub tier: String,
    /// Medal name.
    pub name: String,
    /// Mint time.
    pub earned_at: TimeDto,
}

impl MedalDto {
    fn new(medal: &Medal, tz: Tz) -> Self {
        Self {
            tier: medal.tier.name().to_string(),
            name: medal.name.clone(),
            earned_at: TimeDto::new(medal.timestamp, tz),
        }
    }
}

/// Per-tier spin medal totals.
#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
pub struct MedalStatsDto {
    /// Spin-awarded medals.
    pub total: u64,
    /// Bronze.
    pub bronze: u64,
    /// Silver.
    pub silver: u64,
    /// Gold.
    pub gold: u64,
    /// Black; raffle medals are not counted here.
    pub black: u64,
}

impl From<MedalStats> for MedalStatsDto {
    fn from(s: MedalStats) -> Self {
        Self {
            total: s.total,
            bronze: s.bronze,
            silver: s.silver,
            gold: s.gold,
            black: s.black,
        }
    }
}

/// Time since the previous counted spin.
#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
pub struct GapDto {
    /// Total seconds.
    pub seconds: i64,
    /// Whole days.
    pub days: i64,
    /// Remaining hours.
    pub hours: i64,
    /// Remaining minutes.
    pub minutes: i64,
    /// Longer than the streak allows.
    pub exceeds_streak_gap: bool,
}

impl From<SpinGap> for GapDto {
    fn from(g: SpinGap) -> Self {
        Self {
            seconds: g.seconds,
            days: g.days,
            hours: g.hours,
            minutes: g.minutes,
            exceeds_streak_gap: g.exceeds_streak_gap,
        }
    }
}

/// One activity history entry.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ActivityDto {
    /// `spin`, `excluded_spin` or `raffle_win`.
    pub kind: String,
    /// When it happened.
    pub at: TimeDto,
    /// Spin number for counted spins.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spin_number: Option<usize>,
    /// Medal awarded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medal: Option<MedalDto>,
    /// Gap to the previous counted spin.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gap: Option<GapDto>,
    /// Label for entries that are not counted spins.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl ActivityDto {
    /// Renders one history entry.
    #[must_use]
    pub fn new(activity: &Activity, tz: Tz) -> Self {
        let at = TimeDto::new(activity.timestamp, tz);
        match &activity.kind {
            ActivityKind::Spin { number, medal, gap } => Self {
                kind: "spin".to_string(),
                at,
                spin_number: Some(*number),
                medal: medal.as_ref().map(|m| MedalDto::new(m, tz)),
                gap: gap.map(GapDto::from),
                label: None,
            },
            ActivityKind::ExcludedSpin { label } => Self {
                kind: "excluded_spin".to_string(),
                at,
                spin_number: None,
                medal: None,
                gap: None,
                label: Some(label.clone()),
            },
            ActivityKind::RaffleWin { tier } => Self {
                kind: "raffle_win".to_string(),
                at,
                spin_number: None,
                medal: None,
                gap: None,
                label: Some(format!("{} Medal raffle win", tier.name())),
            },
        }
    }
}

/// Upcoming "spin ready" text.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct NotificationDto {
    /// Cron tick that sends it; absent while a spin is available.
    pub slot: Option<TimeDto>,
    /// Summary, e.g. `Spin #4 notification will be sent on Sep 5, 2025 at 1:30 PM EDT`.
    pub description: Option<String>,
    /// Where texts go, e.g. `iMessage will be sent to +1********67`.
    pub status: Option<String>,
}

impl NotificationDto {
    /// Describes the notification for spin `next_spin_number`.
    #[must_use]
    pub fn new(slot: Option<i64>, next_spin_number: usize, ctx: &DisplayContext) -> Self {
        Self {
            slot: slot.map(|ts| TimeDto::new(ts, ctx.tz)),
            description: slot.map(|ts| {
                format!(
                    "Spin #{next_spin_number} notification will be sent on {} at {}",
                    format_date(ts, ctx.tz),
                    format_clock(ts, ctx.tz)
                )
            }),
            status: ctx
                .recipient
                .as_ref()
                .map(|r| format!("iMessage will be sent to {r}")),
        }
    }
}

/// Response for `GET /api/v1/status` and `GET /api/v1/wallets/{address}`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CollectorStatusResponse {
    /// Collector address, checksummed.
    pub address: String,
    /// Primary ENS name.
    pub ens_name: Option<String>,
    /// ENS name, else the shortened address.
    pub display_name: String,
    /// Stack NFT id.
    pub stack_id: Option<String>,
    /// Schedule.
    pub schedule: ScheduleDto,
    /// Streak.
    pub streak: StreakDto,
    /// The contract's own eligibility answer.
    pub contract_can_spin: bool,
    /// Medal totals.
    pub medal_stats: MedalStatsDto,
    /// Medals, oldest first.
    pub medals: Vec<MedalDto>,
    /// Activity history, newest first.
    pub history: Vec<ActivityDto>,
    /// Raffle status.
    pub raffle: RaffleStatusDto,
    /// Upcoming notification.
    pub notification: NotificationDto,
    /// Open the dapp through the MetaMask mobile deep link.
    pub use_metamask_deeplink: bool,
    /// Poll cadence for the dashboard.
    pub suggested_poll_interval_secs: u64,
    /// Evaluation time.
    pub computed_at: TimeDto,
}

impl CollectorStatusResponse {
    /// Renders a service result.
    #[must_use]
    pub fn new(status: &CollectorStatus, ctx: &DisplayContext) -> Self {
        let tz = ctx.tz;
        let schedule = ScheduleDto::new(&status.schedule, status.computed_at, tz);
        let notification =
            NotificationDto::new(status.notification_slot, schedule.next_spin_number, ctx);
        Self {
            address: status.address.to_string(),
            ens_name: status.ens_name.clone(),
            display_name: status
                .ens_name
                .clone()
                .unwrap_or_else(|| short_address(&status.address)),
            stack_id: status.stack_id.map(|id| id.to_string()),
            schedule,
            streak: status.streak.into(),
            contract_can_spin: status.contract_can_spin,
            medal_stats: status.medal_stats.into(),
            medals: status.medals.iter().map(|m| MedalDto::new(m, tz)).collect(),
            history: status
                .history
                .iter()
                .map(|a| ActivityDto::new(a, tz))
                .collect(),
            raffle: RaffleStatusDto::from(&status.raffle),
            notification,
            use_metamask_deeplink: ctx.use_metamask_deeplink,
            suggested_poll_interval_secs: status.poll_interval_secs,
            computed_at: TimeDto::new(status.computed_at, tz),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::medal::MedalTier;
    use chrono_tz::America::New_York;

    fn ctx() -> DisplayContext {
        DisplayContext {
            tz: New_York,
            recipient: Some("+1********67".into()),
            use_metamask_deeplink: false,
        }
    }

    #[test]
    fn notification_text_uses_display_timezone() {
        let dto = NotificationDto::new(Some(1_757_007_000), 4, &ctx());
        assert_eq!(
            dto.description.as_deref(),
            Some("Spin #4 notification will be sent on Sep 4, 2025 at 1:30 PM EDT")
        );
        assert_eq!(dto.status.as_deref(), Some("iMessage will be sent to +1********67"));
        assert!(NotificationDto::new(None, 4, &ctx()).description.is_none());
    }

    #[test]
    fn activity_kinds_render() {
        let spin = Activity {
            timestamp: 1_757_000_000,
            kind: ActivityKind::Spin {
                number: 3,
                medal: Some(Medal {
                    tier: MedalTier::Gold,
                    name: "Gold".into(),
                    timestamp: 1_757_000_005,
                }),
                gap: Some(SpinGap::new(90_000, 172_800)),
            },
        };
        let dto = ActivityDto::new(&spin, New_York);
        assert_eq!(dto.kind, "spin");
        assert_eq!(dto.spin_number, Some(3));
        assert_eq!(dto.medal.map(|m| m.tier), Some("Gold".to_string()));

        let win = Activity {
            timestamp: 1_757_000_000,
            kind: ActivityKind::RaffleWin {
                tier: MedalTier::Black,
            },
        };
        let dto = ActivityDto::new(&win, New_York);
        assert_eq!(dto.kind, "raffle_win");
        assert_eq!(dto.label.as_deref(), Some("Black/Obsidian Medal raffle win"));
    }

    #[test]
    fn schedule_counts_down() {
        let state = ScheduleState {
            spin_count: 2,
            last_spin_timestamp: Some(1_757_000_000),
            next_eligible_timestamp: 1_757_086_400,
            can_spin_now: false,
            phase: SpinPhase::CoolingDown,
        };
        let dto = ScheduleDto::new(&state, 1_757_086_400 - 3_660, New_York);
        assert_eq!(dto.next_spin_number, 3);
        assert_eq!(dto.phase, "COOLING_DOWN");
        assert_eq!(dto.time_until_eligible, "1h 1m");
    }
}
