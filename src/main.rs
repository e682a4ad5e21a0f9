//! spin-shape server entry point.
//!
//! Starts the Axum HTTP server and the background maintenance tasks.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use spin_shape::api;
use spin_shape::app_state::AppState;
use spin_shape::chain::{ChainReader, RpcChainReader};
use spin_shape::config::{LogFormat, ServiceConfig};
use spin_shape::notify::{LoopMessageNotifier, Notifier};
use spin_shape::persistence::{MemoryPersistence, Persistence, PostgresPersistence};

const MAINTENANCE_EVERY: Duration = Duration::from_secs(5 * 60);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

async fn open_store(config: &ServiceConfig) -> anyhow::Result<Arc<dyn Persistence>> {
    if !config.persistence_enabled {
        tracing::info!("persistence disabled; using in-memory store");
        return Ok(Arc::new(MemoryPersistence::new()));
    }
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .min_connections(config.database_min_connections)
        .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
        .connect(&config.database_url)
        .await
        .context("connecting to postgres")?;
    let store = PostgresPersistence::new(pool);
    store.migrate().await.context("running migrations")?;
    tracing::info!("postgres store ready");
    Ok(Arc::new(store))
}

fn spawn_maintenance(state: &AppState, rate_window: Duration) {
    let state = state.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(MAINTENANCE_EVERY);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let cached = state.spin_service.purge_caches().await + state.medal_service.purge_cache().await;
            let limited = state.rate_limiter.cleanup(rate_window * 2).await;
            tracing::debug!(cached, limited, "expired entries purged");
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServiceConfig::from_env()
        .map_err(|e| anyhow::anyhow!(e))
        .context("loading configuration")?;
    init_tracing(config.log_format);
    tracing::info!(addr = %config.listen_addr, "starting spin-shape");

    if config.public_address.is_none() {
        tracing::warn!("PUBLIC_ADDRESS unset; home collector endpoints will fail");
    }

    let store = open_store(&config).await?;
    let chain: Arc<dyn ChainReader> = Arc::new(RpcChainReader::new(&config.rpc)?);
    let notifier: Option<Arc<dyn Notifier>> = match config.loopmessage.clone() {
        Some(settings) => Some(Arc::new(LoopMessageNotifier::new(settings)?)),
        None => {
            tracing::info!("LoopMessage not configured; notifications disabled");
            None
        }
    };

    let app_state = AppState::new(&config, chain, store, notifier);
    spawn_maintenance(&app_state, config.rate_limit.window);

    let app = Router::new()
        .merge(api::build_router())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
