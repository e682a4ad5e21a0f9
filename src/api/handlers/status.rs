//! Collector status handlers: the home collector and any wallet.

use axum::extract::{Path, State};
use axum::http::HeaderValue;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use tracing::info;

use crate::api::dto::{CollectorStatusResponse, DisplayContext};
use crate::api::extract::ClientInfo;
use crate::app_state::AppState;
use crate::domain::collector::CollectorQuery;
use crate::error::{ErrorResponse, ServiceError};
use crate::rate_limit::client_key;

pub(crate) fn display_context(state: &AppState) -> DisplayContext {
    DisplayContext {
        tz: state.settings.display_timezone,
        recipient: state.notify_service.masked_recipient(),
        use_metamask_deeplink: state.settings.use_metamask_mobile_deeplink,
    }
}

/// `GET /status` — Full status of the home collector.
///
/// # Errors
///
/// Returns [`ServiceError::NotConfigured`] without `PUBLIC_ADDRESS` and
/// [`ServiceError::Chain`] when the chain cannot be read.
#[utoipa::path(
    get,
    path = "/api/v1/status",
    tag = "Status",
    summary = "Home collector status",
    description = "Schedule, streak, medals, activity history and raffle status of the configured collector.",
    responses(
        (status = 200, description = "Collector status", body = CollectorStatusResponse),
        (status = 500, description = "No home collector configured", body = ErrorResponse),
        (status = 502, description = "Chain unavailable", body = ErrorResponse),
    )
)]
pub async fn home_status(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    let status = state.spin_service.home_status_at(Utc::now()).await?;
    Ok(Json(CollectorStatusResponse::new(&status, &display_context(&state))))
}

/// `GET /wallets/{address}` — Full status of any collector.
///
/// Rate limited per client and wallet; every lookup is recorded.
///
/// # Errors
///
/// Returns [`ServiceError::RateLimited`] past the limit,
/// [`ServiceError::InvalidCollector`] or [`ServiceError::EnsNotResolved`]
/// for unusable identifiers, and [`ServiceError::Chain`] when the chain
/// cannot be read.
#[utoipa::path(
    get,
    path = "/api/v1/wallets/{address}",
    tag = "Status",
    summary = "Wallet status",
    description = "Same view as /status for any collector, addressed by hex address or .eth name.",
    params(
        ("address" = String, Path, description = "0x address or ENS name"),
    ),
    responses(
        (status = 200, description = "Collector status", body = CollectorStatusResponse),
        (status = 400, description = "Invalid collector", body = ErrorResponse),
        (status = 404, description = "ENS name not resolved", body = ErrorResponse),
        (status = 429, description = "Rate limited", body = ErrorResponse),
    )
)]
pub async fn wallet_status(
    State(state): State<AppState>,
    client: ClientInfo,
    Path(address): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let decision = state
        .rate_limiter
        .check(&client_key(&client.ip, Some(&address)))
        .await;
    if !decision.allowed {
        info!(ip = %client.ip, blocked = decision.blocked, "wallet lookup rate limited");
        return Err(ServiceError::RateLimited {
            retry_after_ms: u64::try_from(decision.reset_in.as_millis()).unwrap_or(u64::MAX),
        });
    }

    let query: CollectorQuery = address.parse()?;
    let status = state
        .spin_service
        .collector_status_at(&query, Utc::now(), Some(client.visit()))
        .await?;

    let mut response = Json(CollectorStatusResponse::new(&status, &display_context(&state))).into_response();
    response
        .headers_mut()
        .insert("x-ratelimit-remaining", HeaderValue::from(decision.remaining));
    Ok(response)
}

/// Status routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/status", get(home_status))
        .route("/wallets/{address}", get(wallet_status))
}
