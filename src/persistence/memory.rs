//! In-process persistence used when Postgres is disabled and in tests.

use std::collections::{BTreeMap, HashMap};

use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;
use tokio::sync::RwLock;

use super::Persistence;
use super::models::{WalletRecord, WalletVisit, address_key};
use crate::domain::global_stats::GlobalMedalStats;
use crate::domain::raffle::RaffleWinner;
use crate::error::ServiceError;

#[derive(Debug, Default)]
struct State {
    global_stats: Option<GlobalMedalStats>,
    cursors: HashMap<Address, u64>,
    wallets: HashMap<Address, WalletRecord>,
    winners: BTreeMap<u64, Address>,
}

/// Volatile store with the same behaviour as the Postgres one.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    state: RwLock<State>,
}

impl MemoryPersistence {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn blank_wallet(address: &Address) -> WalletRecord {
    WalletRecord {
        wallet_address: address_key(address),
        ens_name: None,
        ens_expires_at: None,
        visit_count: 0,
        last_visit: None,
    }
}

impl Persistence for MemoryPersistence {
    fn load_global_stats(&self) -> BoxFuture<'_, Result<Option<GlobalMedalStats>, ServiceError>> {
        Box::pin(async move { Ok(self.state.read().await.global_stats) })
    }

    fn save_global_stats(&self, stats: GlobalMedalStats) -> BoxFuture<'_, Result<(), ServiceError>> {
        Box::pin(async move {
            self.state.write().await.global_stats = Some(stats);
            Ok(())
        })
    }

    fn load_cursor(&self, collector: Address) -> BoxFuture<'_, Result<Option<u64>, ServiceError>> {
        Box::pin(async move { Ok(self.state.read().await.cursors.get(&collector).copied()) })
    }

    fn save_cursor(
        &self,
        collector: Address,
        last_notified_spin: u64,
    ) -> BoxFuture<'_, Result<(), ServiceError>> {
        Box::pin(async move {
            self.state
                .write()
                .await
                .cursors
                .insert(collector, last_notified_spin);
            Ok(())
        })
    }

    fn record_visit(&self, visit: WalletVisit) -> BoxFuture<'_, Result<(), ServiceError>> {
        Box::pin(async move {
            let mut state = self.state.write().await;
            let row = state
                .wallets
                .entry(visit.address)
                .or_insert_with(|| blank_wallet(&visit.address));
            row.visit_count += 1;
            row.last_visit = Some(visit.visited_at);
            if visit.ens_name.is_some() {
                row.ens_name = visit.ens_name;
            }
            Ok(())
        })
    }

    fn wallet(&self, address: Address) -> BoxFuture<'_, Result<Option<WalletRecord>, ServiceError>> {
        Box::pin(async move { Ok(self.state.read().await.wallets.get(&address).cloned()) })
    }

    fn cached_ens_name(
        &self,
        address: Address,
        now: DateTime<Utc>,
    ) -> BoxFuture<'_, Result<Option<String>, ServiceError>> {
        Box::pin(async move {
            let state = self.state.read().await;
            Ok(state
                .wallets
                .get(&address)
                .filter(|w| w.ens_expires_at.is_some_and(|at| at > now))
                .and_then(|w| w.ens_name.clone()))
        })
    }

    fn cache_ens_name(
        &self,
        address: Address,
        name: String,
        expires_at: DateTime<Utc>,
    ) -> BoxFuture<'_, Result<(), ServiceError>> {
        Box::pin(async move {
            let mut state = self.state.write().await;
            let row = state
                .wallets
                .entry(address)
                .or_insert_with(|| blank_wallet(&address));
            row.ens_name = Some(name);
            row.ens_expires_at = Some(expires_at);
            Ok(())
        })
    }

    fn known_winners(&self, rounds: Vec<u64>) -> BoxFuture<'_, Result<Vec<RaffleWinner>, ServiceError>> {
        Box::pin(async move {
            let state = self.state.read().await;
            let mut found: Vec<RaffleWinner> = rounds
                .into_iter()
                .filter_map(|round| {
                    state
                        .winners
                        .get(&round)
                        .map(|winner| RaffleWinner { round, winner: *winner })
                })
                .collect();
            found.sort_by_key(|w| w.round);
            Ok(found)
        })
    }

    fn save_winners(&self, winners: Vec<RaffleWinner>) -> BoxFuture<'_, Result<(), ServiceError>> {
        Box::pin(async move {
            let mut state = self.state.write().await;
            for w in winners {
                state.winners.entry(w.round).or_insert(w.winner);
            }
            Ok(())
        })
    }
}
