//! Cron endpoint DTOs.

use chrono_tz::Tz;
use serde::Serialize;
use utoipa::ToSchema;

use super::common_dto::TimeDto;
use crate::notify::Delivery;
use crate::service::{NotifyReport, TestNotification};

/// Response for `GET /config/cron`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CronConfigResponse {
    /// Crontab expression.
    pub cron_schedule: String,
    /// Cadence in minutes.
    pub interval_minutes: u32,
    /// Summary.
    pub description: String,
}

impl CronConfigResponse {
    /// Describes a cron running every `minutes`.
    #[must_use]
    pub fn every(minutes: u32) -> Self {
        Self {
            cron_schedule: format!("*/{minutes} * * * *"),
            interval_minutes: minutes,
            description: format!("Checking every {minutes} minutes"),
        }
    }
}

/// Response for `POST /api/v1/cron/check-and-notify`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct NotifyReportResponse {
    /// Counted spins.
    pub spin_count: usize,
    /// Whether a spin is permitted now.
    pub can_spin_now: bool,
    /// Number of the upcoming spin.
    pub next_spin_number: u64,
    /// When it becomes available.
    pub next_eligible: TimeDto,
    /// Seconds until then.
    pub seconds_until_eligible: i64,
    /// A notifier is configured.
    pub notifications_enabled: bool,
    /// A text went out during this run.
    pub notification_sent: bool,
    /// Last spin number notified.
    pub last_notified_spin: Option<u64>,
    /// Summary.
    pub message: String,
    /// Delivery failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl NotifyReportResponse {
    /// Renders a cron run.
    #[must_use]
    pub fn new(report: &NotifyReport, tz: Tz) -> Self {
        Self {
            spin_count: report.spin_count,
            can_spin_now: report.can_spin_now,
            next_spin_number: report.next_spin_number,
            next_eligible: TimeDto::new(report.next_eligible_timestamp, tz),
            seconds_until_eligible: report.seconds_until_eligible,
            notifications_enabled: report.notifications_enabled,
            notification_sent: report.notification_sent,
            last_notified_spin: report.last_notified_spin,
            message: report.message.clone(),
            error: report.error.clone(),
        }
    }
}

/// Response for `POST /api/v1/cron/test-notification`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TestNotificationResponse {
    /// Always `true`; failures come back as errors.
    pub success: bool,
    /// Masked recipient.
    pub recipient: String,
    /// Provider name.
    pub provider: String,
    /// Text sent.
    pub message: String,
    /// Provider receipt.
    pub delivery: Delivery,
}

impl From<TestNotification> for TestNotificationResponse {
    fn from(t: TestNotification) -> Self {
        Self {
            success: true,
            recipient: t.recipient,
            provider: t.provider.to_string(),
            message: t.text,
            delivery: t.delivery,
        }
    }
}
