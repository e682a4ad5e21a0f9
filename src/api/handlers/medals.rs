//! Global medal statistics handler.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;

use crate::api::dto::GlobalMedalStatsResponse;
use crate::app_state::AppState;
use crate::error::{ErrorResponse, ServiceError};

/// `GET /medals/global` — Network-wide Medal Spin medal counts.
///
/// Stale counters are served as they are while a background scan runs.
///
/// # Errors
///
/// Returns [`ServiceError::Persistence`] when storage cannot be read.
#[utoipa::path(
    get,
    path = "/api/v1/medals/global",
    tag = "Medals",
    summary = "Global medal stats",
    description = "Medal counters across all collectors, indexed incrementally from medal logs.",
    responses(
        (status = 200, description = "Global counters", body = GlobalMedalStatsResponse),
        (status = 500, description = "Storage unavailable", body = ErrorResponse),
    )
)]
pub async fn global_medals(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    let now = Utc::now();
    let stats = state.medal_service.global_stats_at(now).await?;
    Ok(Json(GlobalMedalStatsResponse::new(
        &stats,
        now,
        state.settings.global_stats_refresh_secs,
    )))
}

/// Medal routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/medals/global", get(global_medals))
}
