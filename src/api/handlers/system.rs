//! System endpoints: health check and cron cadence.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::api::dto::CronConfigResponse;
use crate::app_state::AppState;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    status: String,
    timestamp: String,
    version: String,
}

/// `GET /health` — Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health status, version, and current timestamp.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// `GET /config/cron` — Cron cadence used for notification slots.
#[utoipa::path(
    get,
    path = "/config/cron",
    tag = "System",
    summary = "Cron configuration",
    description = "The cron expression and cadence the dashboard uses to predict notification times.",
    responses(
        (status = 200, description = "Cron cadence", body = CronConfigResponse),
    )
)]
pub async fn cron_config_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(CronConfigResponse::every(state.settings.cron_interval_minutes))
}

/// System routes mounted at the root level (not under /api/v1).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/config/cron", get(cron_config_handler))
}
