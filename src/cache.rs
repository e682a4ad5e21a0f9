//! In-memory TTL caches driven by a single [`CachePolicy`].
//!
//! Every cached value belongs to a [`CacheKind`]; the policy maps each kind
//! to a time-to-live (or none, for entries that live until invalidated).
//! Storage follows the registry pattern: a `tokio::sync::RwLock` around a
//! `HashMap`, with lazy expiry on read plus a periodic sweep.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

/// Categories of cached data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKind {
    /// Successful reverse ENS lookups.
    Ens,
    /// Failed ENS lookups.
    EnsFailure,
    /// Spin history of the home collector.
    HomeSpins,
    /// Spin history of any other collector.
    WalletSpins,
    /// Decoded medals per collector.
    Medals,
    /// Raffle status snapshots.
    RaffleStatus,
    /// Past raffle winners.
    RaffleHistory,
    /// Global medal counters.
    GlobalStats,
}

impl CacheKind {
    /// Every kind, for iteration in configuration code.
    pub const ALL: [Self; 8] = [
        Self::Ens,
        Self::EnsFailure,
        Self::HomeSpins,
        Self::WalletSpins,
        Self::Medals,
        Self::RaffleStatus,
        Self::RaffleHistory,
        Self::GlobalStats,
    ];

    /// Environment suffix used by `CACHE_TTL_<KIND>_SECS`.
    #[must_use]
    pub const fn env_key(self) -> &'static str {
        match self {
            Self::Ens => "ENS",
            Self::EnsFailure => "ENS_FAILURE",
            Self::HomeSpins => "HOME_SPINS",
            Self::WalletSpins => "WALLET_SPINS",
            Self::Medals => "MEDALS",
            Self::RaffleStatus => "RAFFLE_STATUS",
            Self::RaffleHistory => "RAFFLE_HISTORY",
            Self::GlobalStats => "GLOBAL_STATS",
        }
    }

    /// Built-in time-to-live; `None` means "until invalidated".
    #[must_use]
    pub const fn default_ttl(self) -> Option<Duration> {
        const HOUR: u64 = 3_600;
        match self {
            Self::Ens => Some(Duration::from_secs(30 * 24 * HOUR)),
            Self::EnsFailure | Self::WalletSpins | Self::Medals | Self::RaffleHistory | Self::GlobalStats => {
                Some(Duration::from_secs(HOUR))
            }
            Self::HomeSpins => None,
            Self::RaffleStatus => Some(Duration::from_secs(5 * 60)),
        }
    }
}

/// Kind → TTL table shared by every cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePolicy {
    ttls: HashMap<CacheKind, Option<Duration>>,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            ttls: CacheKind::ALL
                .into_iter()
                .map(|kind| (kind, kind.default_ttl()))
                .collect(),
        }
    }
}

impl CachePolicy {
    /// Overrides the TTL of one kind. `None` keeps entries until invalidated.
    #[must_use]
    pub fn with_ttl(mut self, kind: CacheKind, ttl: Option<Duration>) -> Self {
        self.ttls.insert(kind, ttl);
        self
    }

    /// TTL for `kind`.
    #[must_use]
    pub fn ttl(&self, kind: CacheKind) -> Option<Duration> {
        self.ttls.get(&kind).copied().unwrap_or_else(|| kind.default_ttl())
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

/// String-keyed cache of `V` values with per-entry expiry.
#[derive(Debug)]
pub struct TtlCache<V> {
    policy: CachePolicy,
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
}

impl<V: Clone> TtlCache<V> {
    /// Creates an empty cache governed by `policy`.
    #[must_use]
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            policy,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns a live value, dropping it first if it expired.
    pub async fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        {
            let map = self.entries.read().await;
            match map.get(key) {
                None => return None,
                Some(entry) if entry.is_live(now) => return Some(entry.value.clone()),
                Some(_) => {}
            }
        }
        self.entries.write().await.remove(key);
        None
    }

    /// Stores `value` with the TTL that the policy assigns to `kind`.
    pub async fn insert(&self, key: impl Into<String>, value: V, kind: CacheKind) {
        let expires_at = self
            .policy
            .ttl(kind)
            .and_then(|ttl| Instant::now().checked_add(ttl));
        self.entries
            .write()
            .await
            .insert(key.into(), CacheEntry { value, expires_at });
    }

    /// Removes `key`; returns whether it was present.
    pub async fn invalidate(&self, key: &str) -> bool {
        self.entries.write().await.remove(key).is_some()
    }

    /// Drops every expired entry and returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut map = self.entries.write().await;
        let before = map.len();
        map.retain(|_, entry| entry.is_live(now));
        before - map.len()
    }

    /// Number of stored entries, including not-yet-swept expired ones.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// `true` when nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn short_policy() -> CachePolicy {
        CachePolicy::default().with_ttl(CacheKind::RaffleStatus, Some(Duration::from_millis(20)))
    }

    #[test]
    fn default_policy_matches_kinds() {
        let policy = CachePolicy::default();
        assert_eq!(policy.ttl(CacheKind::HomeSpins), None);
        assert_eq!(policy.ttl(CacheKind::Ens), Some(Duration::from_secs(2_592_000)));
        assert_eq!(policy.ttl(CacheKind::RaffleStatus), Some(Duration::from_secs(300)));
    }

    #[tokio::test]
    async fn insert_get_invalidate() {
        let cache: TtlCache<u32> = TtlCache::new(CachePolicy::default());
        cache.insert("a", 7, CacheKind::HomeSpins).await;
        assert_eq!(cache.get("a").await, Some(7));
        assert!(cache.invalidate("a").await);
        assert_eq!(cache.get("a").await, None);
        assert!(!cache.invalidate("a").await);
    }

    #[tokio::test]
    async fn entries_expire() {
        let cache: TtlCache<&'static str> = TtlCache::new(short_policy());
        cache.insert("raffle", "open", CacheKind::RaffleStatus).await;
        cache.insert("spins", "kept", CacheKind::HomeSpins).await;
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(cache.purge_expired().await, 1);
        assert_eq!(cache.get("raffle").await, None);
        assert_eq!(cache.get("spins").await, Some("kept"));
    }

    #[tokio::test]
    async fn expired_read_removes_entry() {
        let cache: TtlCache<u8> = TtlCache::new(short_policy());
        cache.insert("k", 1, CacheKind::RaffleStatus).await;
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.get("k").await, None);
        assert!(cache.is_empty().await);
    }
}
