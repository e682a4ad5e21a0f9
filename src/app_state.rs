//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use chrono_tz::Tz;

use crate::chain::ChainReader;
use crate::config::ServiceConfig;
use crate::notify::Notifier;
use crate::persistence::Persistence;
use crate::rate_limit::RateLimiter;
use crate::service::{MedalService, NotifyService, SpinService, SpinSettings};

/// Presentation and access settings the handlers need.
#[derive(Debug, Clone)]
pub struct ApiSettings {
    /// Bearer token for cron endpoints; `None` leaves them open.
    pub cron_secret: Option<String>,
    /// Cron cadence in minutes.
    pub cron_interval_minutes: u32,
    /// Timezone used for display strings.
    pub display_timezone: Tz,
    /// Echoed to the dashboard.
    pub use_metamask_mobile_deeplink: bool,
    /// Age after which global medal stats count as stale.
    pub global_stats_refresh_secs: i64,
}

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Collector status, schedule and raffle queries.
    pub spin_service: Arc<SpinService>,
    /// "Spin ready" notifications.
    pub notify_service: Arc<NotifyService>,
    /// Network-wide medal counters.
    pub medal_service: Arc<MedalService>,
    /// Limiter for the public wallet lookup.
    pub rate_limiter: Arc<RateLimiter>,
    /// Handler settings.
    pub settings: Arc<ApiSettings>,
}

impl AppState {
    /// Wires the services over the given chain reader, store and notifier.
    #[must_use]
    pub fn new(
        config: &ServiceConfig,
        chain: Arc<dyn ChainReader>,
        store: Arc<dyn Persistence>,
        notifier: Option<Arc<dyn Notifier>>,
    ) -> Self {
        let spin_service = Arc::new(SpinService::new(
            Arc::clone(&chain),
            Arc::clone(&store),
            SpinSettings {
                home: config.public_address,
                streak: config.streak,
                overrides: config.overrides.clone(),
                cache: config.cache.clone(),
                cron_interval_minutes: config.cron_interval_minutes,
            },
        ));
        let notify_service = Arc::new(NotifyService::new(
            Arc::clone(&spin_service),
            Arc::clone(&store),
            notifier,
            config.spin_dapp_url.clone(),
        ));
        let medal_service = Arc::new(MedalService::new(
            chain,
            store,
            config.cache.clone(),
            config.global_stats_refresh_secs,
        ));
        Self {
            spin_service,
            notify_service,
            medal_service,
            rate_limiter: Arc::new(RateLimiter::new(config.rate_limit)),
            settings: Arc::new(ApiSettings {
                cron_secret: config.cron_secret.clone(),
                cron_interval_minutes: config.cron_interval_minutes,
                display_timezone: config.display_timezone,
                use_metamask_mobile_deeplink: config.use_metamask_mobile_deeplink,
                global_stats_refresh_secs: config.global_stats_refresh_secs,
            }),
        }
    }
}
