//! REST endpoint handlers organized by resource.

pub mod cron;
pub mod medals;
pub mod raffle;
pub mod schedule;
pub mod status;
pub mod system;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(status::routes())
        .merge(schedule::routes())
        .merge(raffle::routes())
        .merge(medals::routes())
        .merge(cron::routes())
}
