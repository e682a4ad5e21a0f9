//! Black Medal raffle handler.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;

use crate::api::dto::{RaffleQuery, RaffleResponse};
use crate::app_state::AppState;
use crate::domain::collector::CollectorQuery;
use crate::error::{ErrorResponse, ServiceError};

/// `GET /raffle` — Raffle eligibility, recommendation and recent winners.
///
/// # Errors
///
/// Returns [`ServiceError::InvalidCollector`] or
/// [`ServiceError::EnsNotResolved`] for an unusable `address`, and
/// [`ServiceError::NotConfigured`] when it is omitted without a home
/// collector.
#[utoipa::path(
    get,
    path = "/api/v1/raffle",
    tag = "Raffle",
    summary = "Raffle status",
    description = "Black Medal raffle eligibility for a collector (default: the home collector). Chain failures yield a placeholder status with an error field.",
    params(RaffleQuery),
    responses(
        (status = 200, description = "Raffle info", body = RaffleResponse),
        (status = 400, description = "Invalid collector", body = ErrorResponse),
    )
)]
pub async fn raffle(
    State(state): State<AppState>,
    Query(query): Query<RaffleQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let now = Utc::now();
    let info = match query.address.as_deref() {
        Some(raw) => {
            let collector: CollectorQuery = raw.parse()?;
            state.spin_service.raffle_info_at(&collector, now).await?
        }
        None => state.spin_service.home_raffle_at(now).await?,
    };
    Ok(Json(RaffleResponse::new(&info, state.settings.display_timezone)))
}

/// Raffle routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/raffle", get(raffle))
}
