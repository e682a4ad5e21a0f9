//! Persistence layer: global medal counters, notification cursors, wallet
//! tracking, the ENS name cache and past raffle winners.
//!
//! [`Persistence`] is the seam the services talk to. [`PostgresPersistence`]
//! backs it with `sqlx::PgPool`; [`MemoryPersistence`] keeps everything in
//! process for tests and for deployments with persistence disabled.

pub mod memory;
pub mod models;
pub mod postgres;

use std::fmt;

use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;

use crate::domain::global_stats::GlobalMedalStats;
use crate::domain::raffle::RaffleWinner;
use crate::error::ServiceError;

pub use memory::MemoryPersistence;
pub use models::{WalletRecord, WalletVisit};
pub use postgres::PostgresPersistence;

/// Durable state shared across process restarts.
///
/// Methods return boxed futures so the store can sit behind `Arc<dyn _>`.
pub trait Persistence: Send + Sync + fmt::Debug {
    /// Loads the global medal counters, if ever saved.
    fn load_global_stats(&self) -> BoxFuture<'_, Result<Option<GlobalMedalStats>, ServiceError>>;

    /// Replaces the global medal counters.
    fn save_global_stats(&self, stats: GlobalMedalStats) -> BoxFuture<'_, Result<(), ServiceError>>;

    /// Last spin number a notification was sent for.
    fn load_cursor(&self, collector: Address) -> BoxFuture<'_, Result<Option<u64>, ServiceError>>;

    /// Advances the notification cursor.
    fn save_cursor(
        &self,
        collector: Address,
        last_notified_spin: u64,
    ) -> BoxFuture<'_, Result<(), ServiceError>>;

    /// Records a wallet lookup and bumps its visit count.
    fn record_visit(&self, visit: WalletVisit) -> BoxFuture<'_, Result<(), ServiceError>>;

    /// Loads the tracking row for `address`.
    fn wallet(&self, address: Address) -> BoxFuture<'_, Result<Option<WalletRecord>, ServiceError>>;

    /// A cached ENS name that has not expired at `now`.
    fn cached_ens_name(
        &self,
        address: Address,
        now: DateTime<Utc>,
    ) -> BoxFuture<'_, Result<Option<String>, ServiceError>>;

    /// Caches an ENS name until `expires_at`.
    fn cache_ens_name(
        &self,
        address: Address,
        name: String,
        expires_at: DateTime<Utc>,
    ) -> BoxFuture<'_, Result<(), ServiceError>>;

    /// Known winners among `rounds`.
    fn known_winners(&self, rounds: Vec<u64>) -> BoxFuture<'_, Result<Vec<RaffleWinner>, ServiceError>>;

    /// Stores winners of completed rounds. Past rounds never change.
    fn save_winners(&self, winners: Vec<RaffleWinner>) -> BoxFuture<'_, Result<(), ServiceError>>;
}
