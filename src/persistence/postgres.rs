//! PostgreSQL implementation of the persistence layer.

use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;
use sqlx::PgPool;

use super::Persistence;
use super::models::{WalletRecord, WalletVisit, address_key};
use crate::domain::global_stats::{GlobalMedalStats, MedalCounts, StatsSource};
use crate::domain::raffle::RaffleWinner;
use crate::error::ServiceError;

const GLOBAL_STATS_ROW: &str = "current";

/// PostgreSQL-backed persistence layer using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresPersistence {
    pool: PgPool,
}

fn to_db(value: u64) -> Result<i64, ServiceError> {
    i64::try_from(value)
        .map_err(|_| ServiceError::Persistence(format!("value {value} exceeds BIGINT")))
}

fn from_db(value: i64) -> u64 {
    u64::try_from(value).unwrap_or_default()
}

type StatsRow = (i64, i64, i64, i64, i64, i64, i64, String, Option<DateTime<Utc>>);

impl PostgresPersistence {
    /// Creates a new persistence layer with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the bundled migrations.
    ///
    /// # Errors
    ///
    /// Returns a [`ServiceError::Persistence`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), ServiceError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| ServiceError::Persistence(e.to_string()))
    }

    /// Loads the singleton global stats row.
    ///
    /// # Errors
    ///
    /// Returns a [`ServiceError::Persistence`] on database failure.
    pub async fn load_global_stats(&self) -> Result<Option<GlobalMedalStats>, ServiceError> {
        let row = sqlx::query_as::<_, StatsRow>(
            "SELECT bronze, silver, gold, black, total, last_indexed_block, total_events, \
             data_source, last_updated FROM global_medal_stats WHERE id = $1",
        )
        .bind(GLOBAL_STATS_ROW)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(
            |(bronze, silver, gold, black, total, block, events, source, last_updated)| {
                GlobalMedalStats {
                    counts: MedalCounts {
                        bronze: from_db(bronze),
                        silver: from_db(silver),
                        gold: from_db(gold),
                        black: from_db(black),
                        total: from_db(total),
                    },
                    last_indexed_block: from_db(block),
                    total_events: from_db(events),
                    last_updated,
                    source: StatsSource::parse(&source),
                }
            },
        ))
    }

    /// Upserts the singleton global stats row.
    ///
    /// # Errors
    ///
    /// Returns a [`ServiceError::Persistence`] on database failure.
    pub async fn save_global_stats(&self, stats: &GlobalMedalStats) -> Result<(), ServiceError> {
        let c = stats.counts;
        sqlx::query(
            "INSERT INTO global_medal_stats \
             (id, bronze, silver, gold, black, total, last_indexed_block, total_events, data_source, last_updated) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             ON CONFLICT (id) DO UPDATE SET bronze = EXCLUDED.bronze, silver = EXCLUDED.silver, \
             gold = EXCLUDED.gold, black = EXCLUDED.black, total = EXCLUDED.total, \
             last_indexed_block = EXCLUDED.last_indexed_block, total_events = EXCLUDED.total_events, \
             data_source = EXCLUDED.data_source, last_updated = EXCLUDED.last_updated",
        )
        .bind(GLOBAL_STATS_ROW)
        .bind(to_db(c.bronze)?)
        .bind(to_db(c.silver)?)
        .bind(to_db(c.gold)?)
        .bind(to_db(c.black)?)
        .bind(to_db(c.total)?)
        .bind(to_db(stats.last_indexed_block)?)
        .bind(to_db(stats.total_events)?)
        .bind(stats.source.as_str())
        .bind(stats.last_updated)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Reads the notification cursor for `collector`.
    ///
    /// # Errors
    ///
    /// Returns a [`ServiceError::Persistence`] on database failure.
    pub async fn load_cursor(&self, collector: &Address) -> Result<Option<u64>, ServiceError> {
        let value = sqlx::query_scalar::<_, i64>(
            "SELECT last_notified_spin FROM notification_cursors WHERE collector = $1",
        )
        .bind(address_key(collector))
        .fetch_optional(&self.pool)
        .await?;
        Ok(value.map(from_db))
    }

    /// Writes the notification cursor for `collector`.
    ///
    /// # Errors
    ///
    /// Returns a [`ServiceError::Persistence`] on database failure.
    pub async fn save_cursor(&self, collector: &Address, spin: u64) -> Result<(), ServiceError> {
        sqlx::query(
            "INSERT INTO notification_cursors (collector, last_notified_spin, updated_at) \
             VALUES ($1, $2, now()) \
             ON CONFLICT (collector) DO UPDATE SET last_notified_spin = EXCLUDED.last_notified_spin, \
             updated_at = now()",
        )
        .bind(address_key(collector))
        .bind(to_db(spin)?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Upserts a wallet row and increments its visit count.
    ///
    /// A fresh ENS name never replaces an unexpired cached one with `NULL`.
    ///
    /// # Errors
    ///
    /// Returns a [`ServiceError::Persistence`] on database failure.
    pub async fn record_visit(&self, visit: &WalletVisit) -> Result<(), ServiceError> {
        sqlx::query(
            "INSERT INTO wallets (wallet_address, ens_name, visit_count, last_visit, user_agent, \
             ip_address, referrer, spin_count, medal_count, stack_id, can_spin_now, \
             last_spin_timestamp, updated_at) \
             VALUES ($1, $2, 1, $3, $4, $5, $6, $7, $8, $9, $10, $11, $3) \
             ON CONFLICT (wallet_address) DO UPDATE SET \
             ens_name = COALESCE(EXCLUDED.ens_name, wallets.ens_name), \
             visit_count = wallets.visit_count + 1, last_visit = EXCLUDED.last_visit, \
             user_agent = EXCLUDED.user_agent, ip_address = EXCLUDED.ip_address, \
             referrer = EXCLUDED.referrer, spin_count = EXCLUDED.spin_count, \
             medal_count = EXCLUDED.medal_count, stack_id = EXCLUDED.stack_id, \
             can_spin_now = EXCLUDED.can_spin_now, \
             last_spin_timestamp = EXCLUDED.last_spin_timestamp, updated_at = EXCLUDED.updated_at",
        )
        .bind(address_key(&visit.address))
        .bind(visit.ens_name.as_deref())
        .bind(visit.visited_at)
        .bind(visit.user_agent.as_deref())
        .bind(visit.ip_address.as_deref())
        .bind(visit.referrer.as_deref())
        .bind(to_db(visit.spin_count)?)
        .bind(to_db(visit.medal_count)?)
        .bind(visit.stack_id.as_deref())
        .bind(visit.can_spin_now)
        .bind(visit.last_spin_timestamp)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Loads the tracking row for `address`.
    ///
    /// # Errors
    ///
    /// Returns a [`ServiceError::Persistence`] on database failure.
    pub async fn wallet(&self, address: &Address) -> Result<Option<WalletRecord>, ServiceError> {
        let row = sqlx::query_as::<
            _,
            (String, Option<String>, Option<DateTime<Utc>>, i64, Option<DateTime<Utc>>),
        >(
            "SELECT wallet_address, ens_name, ens_expires_at, visit_count, last_visit \
             FROM wallets WHERE wallet_address = $1",
        )
        .bind(address_key(address))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(
            |(wallet_address, ens_name, ens_expires_at, visit_count, last_visit)| WalletRecord {
                wallet_address,
                ens_name,
                ens_expires_at,
                visit_count,
                last_visit,
            },
        ))
    }

    /// Returns the cached ENS name for `address` if it has not expired.
    ///
    /// # Errors
    ///
    /// Returns a [`ServiceError::Persistence`] on database failure.
    pub async fn cached_ens_name(
        &self,
        address: &Address,
        now: DateTime<Utc>,
    ) -> Result<Option<String>, ServiceError> {
        let name = sqlx::query_scalar::<_, Option<String>>(
            "SELECT ens_name FROM wallets WHERE wallet_address = $1 AND ens_expires_at > $2",
        )
        .bind(address_key(address))
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(name.flatten())
    }

    /// Caches an ENS name on the wallet row.
    ///
    /// # Errors
    ///
    /// Returns a [`ServiceError::Persistence`] on database failure.
    pub async fn cache_ens_name(
        &self,
        address: &Address,
        name: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        sqlx::query(
            "INSERT INTO wallets (wallet_address, ens_name, ens_expires_at, updated_at) \
             VALUES ($1, $2, $3, now()) \
             ON CONFLICT (wallet_address) DO UPDATE SET ens_name = EXCLUDED.ens_name, \
             ens_expires_at = EXCLUDED.ens_expires_at, updated_at = now()",
        )
        .bind(address_key(address))
        .bind(name)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Loads stored winners for `rounds`.
    ///
    /// # Errors
    ///
    /// Returns a [`ServiceError::Persistence`] on database failure or an
    /// unreadable stored address.
    pub async fn known_winners(&self, rounds: &[u64]) -> Result<Vec<RaffleWinner>, ServiceError> {
        let keys = rounds
            .iter()
            .map(|r| to_db(*r))
            .collect::<Result<Vec<_>, _>>()?;
        let rows = sqlx::query_as::<_, (i64, String)>(
            "SELECT round, winner FROM raffle_winners WHERE round = ANY($1) ORDER BY round",
        )
        .bind(keys)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(round, winner)| {
                let winner = winner
                    .parse::<Address>()
                    .map_err(|e| ServiceError::Persistence(format!("stored winner: {e}")))?;
                Ok(RaffleWinner {
                    round: from_db(round),
                    winner,
                })
            })
            .collect()
    }

    /// Inserts winners, leaving already stored rounds untouched.
    ///
    /// # Errors
    ///
    /// Returns a [`ServiceError::Persistence`] on database failure.
    pub async fn save_winners(&self, winners: &[RaffleWinner]) -> Result<(), ServiceError> {
        for w in winners {
            sqlx::query(
                "INSERT INTO raffle_winners (round, winner) VALUES ($1, $2) \
                 ON CONFLICT (round) DO NOTHING",
            )
            .bind(to_db(w.round)?)
            .bind(address_key(&w.winner))
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }
}

impl Persistence for PostgresPersistence {
    fn load_global_stats(&self) -> BoxFuture<'_, Result<Option<GlobalMedalStats>, ServiceError>> {
        Box::pin(Self::load_global_stats(self))
    }

    fn save_global_stats(&self, stats: GlobalMedalStats) -> BoxFuture<'_, Result<(), ServiceError>> {
        Box::pin(async move { Self::save_global_stats(self, &stats).await })
    }

    fn load_cursor(&self, collector: Address) -> BoxFuture<'_, Result<Option<u64>, ServiceError>> {
        Box::pin(async move { Self::load_cursor(self, &collector).await })
    }

    fn save_cursor(
        &self,
        collector: Address,
        last_notified_spin: u64,
    ) -> BoxFuture<'_, Result<(), ServiceError>> {
        Box::pin(async move { Self::save_cursor(self, &collector, last_notified_spin).await })
    }

    fn record_visit(&self, visit: WalletVisit) -> BoxFuture<'_, Result<(), ServiceError>> {
        Box::pin(async move { Self::record_visit(self, &visit).await })
    }

    fn wallet(&self, address: Address) -> BoxFuture<'_, Result<Option<WalletRecord>, ServiceError>> {
        Box::pin(async move { Self::wallet(self, &address).await })
    }

    fn cached_ens_name(
        &self,
        address: Address,
        now: DateTime<Utc>,
    ) -> BoxFuture<'_, Result<Option<String>, ServiceError>> {
        Box::pin(async move { Self::cached_ens_name(self, &address, now).await })
    }

    fn cache_ens_name(
        &self,
        address: Address,
        name: String,
        expires_at: DateTime<Utc>,
    ) -> BoxFuture<'_, Result<(), ServiceError>> {
        Box::pin(async move { Self::cache_ens_name(self, &address, &name, expires_at).await })
    }

    fn known_winners(&self, rounds: Vec<u64>) -> BoxFuture<'_, Result<Vec<RaffleWinner>, ServiceError>> {
        Box::pin(async move { Self::known_winners(self, &rounds).await })
    }

    fn save_winners(&self, winners: Vec<RaffleWinner>) -> BoxFuture<'_, Result<(), ServiceError>> {
        Box::pin(async move { Self::save_winners(self, &winners).await })
    }
}
