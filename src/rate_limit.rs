//! Fixed-window rate limiting with temporary blocks for repeat offenders.
//!
//! A key (client IP, optionally joined with the requested wallet) may make
//! `max_requests` calls per window. A key that keeps going past twice the
//! limit inside one window is blocked for `block_duration`.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

/// Limiter settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Window length.
    pub window: Duration,
    /// Requests allowed per window.
    pub max_requests: u32,
    /// Block length for keys exceeding twice the limit.
    pub block_duration: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(60),
            max_requests: 10,
            block_duration: Duration::from_secs(300),
        }
    }
}

/// Outcome of one check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    /// The request may proceed.
    pub allowed: bool,
    /// Requests left in the current window.
    pub remaining: u32,
    /// Time until the window resets or the block lifts.
    pub reset_in: Duration,
    /// The key is currently blocked.
    pub blocked: bool,
}

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    started: Instant,
    blocked_until: Option<Instant>,
}

/// Shared limiter keyed by client identity.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    windows: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    /// Creates a limiter with `config`.
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Records a request for `key` now.
    pub async fn check(&self, key: &str) -> RateDecision {
        self.check_at(key, Instant::now()).await
    }

    /// Records a request for `key` at `now`.
    pub async fn check_at(&self, key: &str, now: Instant) -> RateDecision {
        let cfg = self.config;
        let mut map = self.windows.lock().await;
        let window = map.entry(key.to_string()).or_insert(Window {
            count: 0,
            started: now,
            blocked_until: None,
        });

        if let Some(until) = window.blocked_until {
            if now < until {
                return RateDecision {
                    allowed: false,
                    remaining: 0,
                    reset_in: until - now,
                    blocked: true,
                };
            }
            *window = Window {
                count: 0,
                started: now,
                blocked_until: None,
            };
        }

        if now.saturating_duration_since(window.started) >= cfg.window {
            window.count = 0;
            window.started = now;
        }

        window.count = window.count.saturating_add(1);
        let reset_in = (window.started + cfg.window).saturating_duration_since(now);

        if window.count > cfg.max_requests {
            if window.count > cfg.max_requests.saturating_mul(2) {
                window.blocked_until = Some(now + cfg.block_duration);
                tracing::warn!(key, count = window.count, "rate limit block applied");
            }
            return RateDecision {
                allowed: false,
                remaining: 0,
                reset_in,
                blocked: window.blocked_until.is_some(),
            };
        }

        RateDecision {
            allowed: true,
            remaining: cfg.max_requests - window.count,
            reset_in,
            blocked: false,
        }
    }

    /// Drops idle, unblocked keys older than `max_age`; returns how many.
    pub async fn cleanup(&self, max_age: Duration) -> usize {
        let now = Instant::now();
        let mut map = self.windows.lock().await;
        let before = map.len();
        map.retain(|_, w| {
            w.blocked_until.is_some_and(|until| now < until)
                || now.saturating_duration_since(w.started) <= max_age
        });
        before - map.len()
    }
}

/// Builds the limiter key for a client, optionally scoped to a wallet.
#[must_use]
pub fn client_key(ip: &str, wallet: Option<&str>) -> String {
    match wallet {
        Some(w) => format!("{ip}:{}", w.to_ascii_lowercase()),
        None => ip.to_string(),
    }
}
