//! Schedule-only view and the lightweight change check.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;

use crate::api::dto::{ScheduleResponse, UpdatesQuery, UpdatesResponse};
use crate::app_state::AppState;
use crate::error::{ErrorResponse, ServiceError};

/// `GET /schedule` — Schedule of the home collector.
///
/// # Errors
///
/// Returns [`ServiceError::NotConfigured`] without `PUBLIC_ADDRESS` and
/// [`ServiceError::Chain`] when the chain cannot be read.
#[utoipa::path(
    get,
    path = "/api/v1/schedule",
    tag = "Schedule",
    summary = "Spin schedule",
    description = "Eligibility, next eligible time, streak and the notification slot.",
    responses(
        (status = 200, description = "Schedule view", body = ScheduleResponse),
        (status = 502, description = "Chain unavailable", body = ErrorResponse),
    )
)]
pub async fn schedule(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    let view = state.spin_service.home_schedule_at(Utc::now()).await?;
    Ok(Json(ScheduleResponse::new(&view, state.settings.display_timezone)))
}

/// `GET /updates` — Has the home collector spun since the client last looked?
///
/// # Errors
///
/// Returns [`ServiceError::NotConfigured`] without `PUBLIC_ADDRESS` and
/// [`ServiceError::Chain`] when the chain cannot be read.
#[utoipa::path(
    get,
    path = "/api/v1/updates",
    tag = "Schedule",
    summary = "Check for updates",
    description = "Reads spins fresh and compares the count with what the client shows. Also returns a poll cadence.",
    params(UpdatesQuery),
    responses(
        (status = 200, description = "Change check", body = UpdatesResponse),
        (status = 502, description = "Chain unavailable", body = ErrorResponse),
    )
)]
pub async fn check_updates(
    State(state): State<AppState>,
    Query(query): Query<UpdatesQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let check = state
        .spin_service
        .check_updates_at(query.known_spin_count, Utc::now())
        .await?;
    Ok(Json(UpdatesResponse::new(&check, state.settings.display_timezone)))
}

/// Schedule routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/schedule", get(schedule))
        .route("/updates", get(check_updates))
}
