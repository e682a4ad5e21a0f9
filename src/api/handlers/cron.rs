//! Cron endpoints. All require `Authorization: Bearer <CRON_SECRET>` when a
//! secret is configured.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use tracing::info;

use crate::api::dto::{NotifyReportResponse, ScanReportResponse, TestNotificationResponse};
use crate::api::extract::CronAuth;
use crate::app_state::AppState;
use crate::error::{ErrorResponse, ServiceError};

/// `POST /cron/check-and-notify` — Text the home collector when a spin is due.
///
/// # Errors
///
/// Returns [`ServiceError::Unauthorized`] on a bad token,
/// [`ServiceError::NotConfigured`] without `PUBLIC_ADDRESS` and
/// [`ServiceError::Chain`] when the chain cannot be read.
#[utoipa::path(
    post,
    path = "/api/v1/cron/check-and-notify",
    tag = "Cron",
    summary = "Check and notify",
    description = "Reads spins fresh and sends at most one \"spin ready\" text per spin number.",
    responses(
        (status = 200, description = "Run report", body = NotifyReportResponse),
        (status = 401, description = "Bad cron token", body = ErrorResponse),
    )
)]
pub async fn check_and_notify(
    _auth: CronAuth,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let report = state.notify_service.check_and_notify_at(Utc::now()).await?;
    info!(
        can_spin_now = report.can_spin_now,
        sent = report.notification_sent,
        "cron check completed"
    );
    Ok(Json(NotifyReportResponse::new(&report, state.settings.display_timezone)))
}

/// `POST /cron/update-global-medals` — Incremental medal log scan.
///
/// # Errors
///
/// Returns [`ServiceError::Unauthorized`] on a bad token and
/// [`ServiceError::Chain`] when the first chunk cannot be read.
#[utoipa::path(
    post,
    path = "/api/v1/cron/update-global-medals",
    tag = "Cron",
    summary = "Update global medal stats",
    description = "Scans medal logs from the block after the last indexed one up to the chain head.",
    responses(
        (status = 200, description = "Scan report", body = ScanReportResponse),
        (status = 401, description = "Bad cron token", body = ErrorResponse),
        (status = 502, description = "Chain unavailable", body = ErrorResponse),
    )
)]
pub async fn update_global_medals(
    _auth: CronAuth,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let report = state.medal_service.update_at(Utc::now()).await?;
    Ok(Json(ScanReportResponse::from(&report)))
}

/// `POST /cron/test-notification` — Send the sample text.
///
/// # Errors
///
/// Returns [`ServiceError::Unauthorized`] on a bad token,
/// [`ServiceError::NotConfigured`] without LoopMessage settings and
/// [`ServiceError::Notification`] when delivery fails.
#[utoipa::path(
    post,
    path = "/api/v1/cron/test-notification",
    tag = "Cron",
    summary = "Send test notification",
    responses(
        (status = 200, description = "Sample sent", body = TestNotificationResponse),
        (status = 401, description = "Bad cron token", body = ErrorResponse),
        (status = 502, description = "Delivery failed", body = ErrorResponse),
    )
)]
pub async fn test_notification(
    _auth: CronAuth,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let sent = state.notify_service.send_test().await?;
    Ok(Json(TestNotificationResponse::from(sent)))
}

/// Cron routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/cron/check-and-notify", post(check_and_notify))
        .route("/cron/update-global-medals", post(update_global_medals))
        .route("/cron/test-notification", post(test_notification))
}
