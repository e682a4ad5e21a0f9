//! # spin-shape
//!
//! Spin schedule, streak and medal tracker for the Medal Spin contract on
//! the Shape network.
//!
//! Spin history is read from the chain. From it the service derives
//! whether the collector may spin now, when the next spin opens up, and
//! how long the daily streak is. It texts the collector when a spin becomes
//! available and tracks medals and the Black Medal raffle.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP dashboard, cron)
//!     │
//!     ├── REST Handlers (api/)
//!     │
//!     ├── SpinService / NotifyService / MedalService (service/)
//!     ├── TtlCache (cache), RateLimiter (rate_limit)
//!     │
//!     ├── Schedule + Streak calculators, medals, raffle (domain/)
//!     │
//!     ├── ChainReader ── alloy RPC pool, multicall, ENS (chain/)
//!     ├── Notifier ───── LoopMessage (notify/)
//!     └── Persistence ── PostgreSQL or in-memory (persistence/)
//! ```

pub mod api;
pub mod app_state;
pub mod cache;
pub mod chain;
pub mod config;
pub mod domain;
pub mod error;
pub mod notify;
pub mod persistence;
pub mod rate_limit;
pub mod service;
