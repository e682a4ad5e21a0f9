//! alloy-backed [`ChainReader`] with endpoint failover.
//!
//! Every read goes through an [`RpcPool`]: endpoints are tried in priority
//! order, each attempt bounded by a timeout. A timeout or a rate-limit
//! answer puts the endpoint in cooldown; when every endpoint is cooling
//! down they are all tried anyway.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use alloy::primitives::{Address, Bytes, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::Filter;
use alloy::transports::http::reqwest::Url;
use futures_util::future::{BoxFuture, join_all};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::contracts::{IBlackMedalRaffle, IMedalSpin, IStack};
use super::{
    ChainReader, CollectorSnapshot, ContractAddresses, ENS_REGISTRY_ADDRESS, MEDAL_AWARDED_TOPIC,
    ens,
};
use crate::domain::medal::RawMedal;
use crate::domain::raffle::{RaffleSnapshot, RaffleWinner, completed_winners};
use crate::domain::spin_event::SpinEvent;
use crate::error::ServiceError;

/// Transport settings for [`RpcChainReader`].
#[derive(Debug, Clone)]
pub struct RpcSettings {
    /// Shape endpoints in priority order.
    pub shape_urls: Vec<String>,
    /// Ethereum mainnet endpoint used for ENS.
    pub ens_url: String,
    /// Per-attempt timeout.
    pub timeout: Duration,
    /// How long a failing endpoint is skipped.
    pub failure_cooldown: Duration,
    /// Contract addresses.
    pub contracts: ContractAddresses,
}

struct Endpoint {
    url: String,
    provider: DynProvider,
    failed_at: Mutex<Option<Instant>>,
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint").field("url", &self.url).finish_non_exhaustive()
    }
}

impl Endpoint {
    async fn cooling_down(&self, now: Instant, cooldown: Duration) -> bool {
        self.failed_at
            .lock()
            .await
            .is_some_and(|at| now.duration_since(at) < cooldown)
    }

    async fn mark_failed(&self) {
        *self.failed_at.lock().await = Some(Instant::now());
    }
}

/// `true` for provider answers that mean "back off".
fn is_rate_limited(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("429")
        || lower.contains("rate limit")
        || lower.contains("capacity limit")
        || lower.contains("too many requests")
}

/// Ordered set of JSON-RPC endpoints with cooldown-based failover.
#[derive(Debug)]
pub struct RpcPool {
    name: &'static str,
    endpoints: Vec<Endpoint>,
    timeout: Duration,
    cooldown: Duration,
}

impl RpcPool {
    /// Builds a pool over `urls`, highest priority first.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotConfigured`] when `urls` is empty or a URL
    /// does not parse.
    pub fn new(
        name: &'static str,
        urls: &[String],
        timeout: Duration,
        cooldown: Duration,
    ) -> Result<Self, ServiceError> {
        let endpoints = urls
            .iter()
            .map(|url| {
                let parsed: Url = url
                    .parse()
                    .map_err(|e| ServiceError::NotConfigured(format!("{name} rpc url {url}: {e}")))?;
                Ok(Endpoint {
                    url: url.clone(),
                    provider: ProviderBuilder::new().connect_http(parsed).erased(),
                    failed_at: Mutex::new(None),
                })
            })
            .collect::<Result<Vec<_>, ServiceError>>()?;
        if endpoints.is_empty() {
            return Err(ServiceError::NotConfigured(format!("{name}: no rpc endpoints")));
        }
        Ok(Self {
            name,
            endpoints,
            timeout,
            cooldown,
        })
    }

    /// Number of configured endpoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// `true` if the pool has no endpoints. Never the case after `new`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Endpoints not cooling down, or all of them when none is available.
    async fn candidates(&self) -> Vec<&Endpoint> {
        let now = Instant::now();
        let mut ready = Vec::with_capacity(self.endpoints.len());
        for endpoint in &self.endpoints {
            if !endpoint.cooling_down(now, self.cooldown).await {
                ready.push(endpoint);
            }
        }
        if ready.is_empty() {
            warn!(pool = self.name, "all rpc endpoints cooling down; trying every one");
            return self.endpoints.iter().collect();
        }
        ready
    }

    /// Runs `op` against each candidate endpoint until one succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Chain`] carrying the last failure when every
    /// endpoint failed.
    pub async fn call<T, E, F, Fut>(&self, label: &str, op: F) -> Result<T, ServiceError>
    where
        F: Fn(DynProvider) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let mut last_error = None;
        for endpoint in self.candidates().await {
            match tokio::time::timeout(self.timeout, op(endpoint.provider.clone())).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(err)) => {
                    let message = err.to_string();
                    if is_rate_limited(&message) {
                        warn!(pool = self.name, url = %endpoint.url, call = label, "rate limited; failing over");
                        endpoint.mark_failed().await;
                    } else {
                        warn!(pool = self.name, url = %endpoint.url, call = label, error = %message, "rpc call failed");
                    }
                    last_error = Some(message);
                }
                Err(_) => {
                    warn!(pool = self.name, url = %endpoint.url, call = label, "rpc call timed out; failing over");
                    endpoint.mark_failed().await;
                    last_error = Some(format!("timeout after {} ms", self.timeout.as_millis()));
                }
            }
        }
        Err(ServiceError::Chain(format!(
            "{label}: {}",
            last_error.unwrap_or_else(|| "no endpoint answered".to_string())
        )))
    }
}

fn to_spin_events(records: Vec<IMedalSpin::SpinInfo>) -> Vec<SpinEvent> {
    let total = records.len();
    let events: Vec<SpinEvent> = records
        .into_iter()
        .filter_map(|r| SpinEvent::from_raw(r.hash, r.timestamp))
        .collect();
    if events.len() < total {
        warn!(skipped = total - events.len(), "dropped spin records with unusable timestamps");
    }
    events
}

fn nonzero(id: U256) -> Option<U256> {
    (!id.is_zero()).then_some(id)
}

struct SnapshotParts {
    can_spin: bool,
    token_id: U256,
    is_participant: bool,
    participants: usize,
    round: U256,
    minimum: U256,
    frozen: bool,
}

impl SnapshotParts {
    fn into_snapshot(self, spins: Option<Vec<SpinEvent>>) -> CollectorSnapshot {
        CollectorSnapshot {
            spins,
            contract_can_spin: self.can_spin,
            stack_id: nonzero(self.token_id),
            raffle: RaffleSnapshot {
                is_participant: self.is_participant,
                participant_count: self.participants as u64,
                current_round: self.round.saturating_to::<u64>(),
                minimum_streak: self.minimum.saturating_to::<u32>(),
                is_frozen: self.frozen,
            },
        }
    }
}

/// Reads the per-collector contract state in one Multicall3 request,
/// falling back to parallel single calls when the aggregate fails.
async fn read_parts(
    provider: DynProvider,
    contracts: ContractAddresses,
    collector: Address,
) -> Result<SnapshotParts, alloy::contract::Error> {
    let spin = IMedalSpin::new(contracts.medal_spin, provider.clone());
    let stack = IStack::new(contracts.stack_nft, provider.clone());
    let raffle = IBlackMedalRaffle::new(contracts.raffle, provider.clone());

    let batched = provider
        .multicall()
        .add(spin.canSpin(collector))
        .add(stack.addressToTokenId(collector))
        .add(raffle.isParticipantInCurrentRaffle(collector))
        .add(raffle.getCurrentRaffleList())
        .add(raffle.getCurrentRaffleRound())
        .add(raffle.getMinimumStreakLength())
        .add(raffle.isFrozen())
        .aggregate()
        .await;

    match batched {
        Ok((can_spin, token_id, is_participant, list, round, minimum, frozen)) => Ok(SnapshotParts {
            can_spin,
            token_id,
            is_participant,
            participants: list.len(),
            round,
            minimum,
            frozen,
        }),
        Err(err) => {
            debug!(error = %err, "multicall failed; using parallel calls");
            let (can_spin, token_id, is_participant, list, round, minimum, frozen) = tokio::try_join!(
                async { spin.canSpin(collector).call().await },
                async { stack.addressToTokenId(collector).call().await },
                async { raffle.isParticipantInCurrentRaffle(collector).call().await },
                async { raffle.getCurrentRaffleList().call().await },
                async { raffle.getCurrentRaffleRound().call().await },
                async { raffle.getMinimumStreakLength().call().await },
                async { raffle.isFrozen().call().await },
            )?;
            Ok(SnapshotParts {
                can_spin,
                token_id,
                is_participant,
                participants: list.len(),
                round,
                minimum,
                frozen,
            })
        }
    }
}

/// [`ChainReader`] over Shape and Ethereum mainnet JSON-RPC.
#[derive(Debug)]
pub struct RpcChainReader {
    shape: RpcPool,
    ens: RpcPool,
    contracts: ContractAddresses,
}

impl RpcChainReader {
    /// Builds the Shape and ENS pools.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotConfigured`] on missing or invalid URLs.
    pub fn new(settings: &RpcSettings) -> Result<Self, ServiceError> {
        let shape = RpcPool::new(
            "shape",
            &settings.shape_urls,
            settings.timeout,
            settings.failure_cooldown,
        )?;
        let ens = RpcPool::new(
            "ens",
            std::slice::from_ref(&settings.ens_url),
            settings.timeout,
            settings.failure_cooldown,
        )?;
        Ok(Self {
            shape,
            ens,
            contracts: settings.contracts,
        })
    }

    async fn fetch_spins(&self, collector: Address) -> Result<Vec<SpinEvent>, ServiceError> {
        let contract = self.contracts.medal_spin;
        let records = self
            .shape
            .call("getSpins", move |p| async move {
                IMedalSpin::new(contract, p).getSpins(collector).call().await
            })
            .await?;
        Ok(to_spin_events(records))
    }

    async fn fetch_snapshot(
        &self,
        collector: Address,
        include_spins: bool,
    ) -> Result<CollectorSnapshot, ServiceError> {
        let contracts = self.contracts;
        let parts = self
            .shape
            .call("collectorSnapshot", move |p| read_parts(p, contracts, collector));
        if include_spins {
            let (parts, spins) = tokio::try_join!(parts, self.fetch_spins(collector))?;
            Ok(parts.into_snapshot(Some(spins)))
        } else {
            Ok(parts.await?.into_snapshot(None))
        }
    }

    async fn fetch_medals(&self, stack_id: U256) -> Result<Vec<RawMedal>, ServiceError> {
        let contract = self.contracts.stack_nft;
        let records = self
            .shape
            .call("getStackMedals", move |p| async move {
                IStack::new(contract, p).getStackMedals(stack_id).call().await
            })
            .await?;
        Ok(records
            .into_iter()
            .map(|m| RawMedal {
                tier: m.medalTier,
                data: m.medalData,
                timestamp: m.timestamp,
            })
            .collect())
    }

    async fn fetch_winners(&self, rounds: Vec<u64>) -> Result<Vec<RaffleWinner>, ServiceError> {
        let contract = self.contracts.raffle;
        let lookups = rounds.into_iter().map(|round| async move {
            let winner = self
                .shape
                .call("getWinnerForRound", move |p| async move {
                    IBlackMedalRaffle::new(contract, p)
                        .getWinnerForRound(U256::from(round))
                        .call()
                        .await
                })
                .await;
            (round, winner)
        });
        let mut found = Vec::new();
        for (round, result) in join_all(lookups).await {
            match result {
                Ok(winner) => found.push((round, winner)),
                Err(err) => warn!(round, error = %err, "raffle winner lookup failed"),
            }
        }
        Ok(completed_winners(found))
    }

    async fn fetch_medal_logs(&self, from: u64, to: u64) -> Result<Vec<Bytes>, ServiceError> {
        let filter = Filter::new()
            .address(self.contracts.stack_nft)
            .event_signature(MEDAL_AWARDED_TOPIC)
            .from_block(from)
            .to_block(to);
        let logs = self
            .shape
            .call("getLogs", |p| {
                let filter = filter.clone();
                async move { p.get_logs(&filter).await }
            })
            .await?;
        Ok(logs.into_iter().map(|log| log.inner.data.data).collect())
    }
}

impl ChainReader for RpcChainReader {
    fn spins(&self, collector: Address) -> BoxFuture<'_, Result<Vec<SpinEvent>, ServiceError>> {
        Box::pin(self.fetch_spins(collector))
    }

    fn collector_snapshot(
        &self,
        collector: Address,
        include_spins: bool,
    ) -> BoxFuture<'_, Result<CollectorSnapshot, ServiceError>> {
        Box::pin(self.fetch_snapshot(collector, include_spins))
    }

    fn stack_medals(&self, stack_id: U256) -> BoxFuture<'_, Result<Vec<RawMedal>, ServiceError>> {
        Box::pin(self.fetch_medals(stack_id))
    }

    fn raffle_winners(&self, rounds: Vec<u64>) -> BoxFuture<'_, Result<Vec<RaffleWinner>, ServiceError>> {
        Box::pin(self.fetch_winners(rounds))
    }

    fn block_number(&self) -> BoxFuture<'_, Result<u64, ServiceError>> {
        Box::pin(
            self.shape
                .call("blockNumber", |p| async move { p.get_block_number().await }),
        )
    }

    fn medal_logs(&self, from: u64, to: u64) -> BoxFuture<'_, Result<Vec<Bytes>, ServiceError>> {
        Box::pin(self.fetch_medal_logs(from, to))
    }

    fn lookup_ens(&self, address: Address) -> BoxFuture<'_, Result<Option<String>, ServiceError>> {
        Box::pin(self.ens.call("ensLookup", move |p| async move {
            ens::lookup(&p, ENS_REGISTRY_ADDRESS, address).await
        }))
    }

    fn resolve_ens(&self, name: String) -> BoxFuture<'_, Result<Option<Address>, ServiceError>> {
        Box::pin(async move {
            self.ens
                .call("ensResolve", |p| {
                    let name = name.clone();
                    async move { ens::resolve(&p, ENS_REGISTRY_ADDRESS, &name).await }
                })
                .await
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn urls(list: &[&str]) -> Vec<String> {
        list.iter().map(|u| (*u).to_string()).collect()
    }

    fn pool(list: &[&str]) -> RpcPool {
        let Ok(pool) = RpcPool::new(
            "test",
            &urls(list),
            Duration::from_millis(200),
            Duration::from_secs(60),
        ) else {
            panic!("pool builds");
        };
        pool
    }

    #[test]
    fn classifies_rate_limit_messages() {
        assert!(is_rate_limited("HTTP error 429 with body"));
        assert!(is_rate_limited("Monthly capacity limit exceeded"));
        assert!(is_rate_limited("Too Many Requests"));
        assert!(!is_rate_limited("execution reverted"));
    }

    #[test]
    fn rejects_missing_or_bad_urls() {
        let empty = RpcPool::new("x", &[], Duration::from_secs(1), Duration::from_secs(1));
        assert!(matches!(empty, Err(ServiceError::NotConfigured(_))));
        let bad = RpcPool::new("x", &urls(&["not a url"]), Duration::from_secs(1), Duration::from_secs(1));
        assert!(matches!(bad, Err(ServiceError::NotConfigured(_))));
    }

    #[tokio::test]
    async fn rate_limited_endpoint_is_skipped_next_time() {
        let pool = pool(&["http://127.0.0.1:1", "http://127.0.0.1:2"]);
        let attempts = AtomicUsize::new(0);
        let first = pool
            .call("probe", |_| {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                async move { if n == 0 { Err("429 Too Many Requests") } else { Ok(n) } }
            })
            .await;
        assert!(matches!(first, Ok(1)));
        assert_eq!(pool.candidates().await.len(), 1);
    }

    #[tokio::test]
    async fn all_cooling_down_tries_everything() {
        let pool = pool(&["http://127.0.0.1:1", "http://127.0.0.1:2"]);
        let result: Result<u8, ServiceError> = pool
            .call("probe", |_| async { Err("rate limit") })
            .await;
        assert!(matches!(result, Err(ServiceError::Chain(ref m)) if m.contains("rate limit")));
        assert_eq!(pool.candidates().await.len(), 2);
    }

    #[tokio::test]
    async fn timeouts_fail_over() {
        let pool = pool(&["http://127.0.0.1:1", "http://127.0.0.1:2"]);
        let attempts = AtomicUsize::new(0);
        let result = pool
            .call("slow", |_| {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                    Ok::<_, String>(n)
                }
            })
            .await;
        assert!(matches!(result, Ok(1)));
    }

    #[test]
    fn snapshot_parts_map_to_domain() {
        let parts = SnapshotParts {
            can_spin: true,
            token_id: U256::ZERO,
            is_participant: false,
            participants: 3,
            round: U256::from(9_u64),
            minimum: U256::from(7_u64),
            frozen: false,
        };
        let snap = parts.into_snapshot(None);
        assert_eq!(snap.stack_id, None);
        assert_eq!(snap.raffle.current_round, 9);
        assert_eq!(snap.raffle.minimum_streak, 7);
        assert_eq!(snap.raffle.participant_count, 3);
    }
}
