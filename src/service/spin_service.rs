//! Spin service: loads a collector's on-chain state, runs the calculators
//! and owns the caches in front of the chain.
//!
//! Every public query has an `_at` variant taking an explicit `now` so the
//! whole pipeline can be driven deterministically in tests.

use std::sync::Arc;

use alloy::primitives::{Address, U256};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tracing::{debug, info, warn};

use crate::cache::{CacheKind, CachePolicy, TtlCache};
use crate::chain::{ChainReader, CollectorSnapshot};
use crate::domain::activity::{Activity, HistoryInput, build_history};
use crate::domain::collector::CollectorQuery;
use crate::domain::medal::{Medal, MedalStats, decode_medals, strip_raffle_claims};
use crate::domain::overrides::OverrideTable;
use crate::domain::raffle::{
    DrawTiming, Milestone, RaffleSnapshot, RaffleStatus, RaffleWinner, Recommendation,
    recent_rounds,
};
use crate::domain::schedule::{ScheduleState, notification_slot, suggested_poll_interval_secs};
use crate::domain::spin_event::{SpinEvent, UnixSeconds};
use crate::domain::streak::{StreakPolicy, StreakState};
use crate::error::ServiceError;
use crate::persistence::models::address_key;
use crate::persistence::{Persistence, WalletVisit};

/// Completed raffle rounds listed in the raffle view.
pub const RECENT_RAFFLE_ROUNDS: u64 = 5;

const DEFAULT_EXCLUDED_LABEL: &str = "Contract Spin";

/// Static settings of [`SpinService`].
#[derive(Debug, Clone)]
pub struct SpinSettings {
    /// Home collector.
    pub home: Option<Address>,
    /// Streak rule.
    pub streak: StreakPolicy,
    /// Per-collector corrections.
    pub overrides: OverrideTable,
    /// Cache TTLs.
    pub cache: CachePolicy,
    /// Cron cadence for notification slots.
    pub cron_interval_minutes: u32,
}

/// Request metadata recorded with a wallet lookup.
#[derive(Debug, Clone, Default)]
pub struct VisitContext {
    /// Client IP.
    pub ip_address: Option<String>,
    /// Client user agent.
    pub user_agent: Option<String>,
    /// Referrer header.
    pub referrer: Option<String>,
}

/// Full status of one collector.
#[derive(Debug, Clone)]
pub struct CollectorStatus {
    /// Collector address.
    pub address: Address,
    /// Verified primary ENS name.
    pub ens_name: Option<String>,
    /// Stack NFT id.
    pub stack_id: Option<U256>,
    /// Schedule view.
    pub schedule: ScheduleState,
    /// Streak view.
    pub streak: StreakState,
    /// The contract's own `canSpin` answer.
    pub contract_can_spin: bool,
    /// Decoded Medal Spin medals, oldest first.
    pub medals: Vec<Medal>,
    /// Spin-reward medal totals.
    pub medal_stats: MedalStats,
    /// Activity history, newest first.
    pub history: Vec<Activity>,
    /// Raffle status.
    pub raffle: RaffleStatus,
    /// Cron tick that will send the next "spin ready" text.
    pub notification_slot: Option<UnixSeconds>,
    /// Poll cadence suggested to the dashboard.
    pub poll_interval_secs: u64,
    /// Evaluation time.
    pub computed_at: UnixSeconds,
}

/// Schedule-only view.
#[derive(Debug, Clone, Copy)]
pub struct ScheduleView {
    /// Collector address.
    pub address: Address,
    /// Schedule view.
    pub schedule: ScheduleState,
    /// Streak view.
    pub streak: StreakState,
    /// Seconds until the next spin; zero once eligible.
    pub seconds_until_eligible: i64,
    /// Cron tick that will send the next "spin ready" text.
    pub notification_slot: Option<UnixSeconds>,
    /// Poll cadence suggested to the dashboard.
    pub poll_interval_secs: u64,
    /// Evaluation time.
    pub computed_at: UnixSeconds,
}

/// Answer of the lightweight change check.
#[derive(Debug, Clone, Copy)]
pub struct UpdateCheck {
    /// Counted spins.
    pub spin_count: usize,
    /// Whether a spin is permitted now.
    pub can_spin_now: bool,
    /// Most recent counted spin.
    pub last_spin_timestamp: Option<UnixSeconds>,
    /// Spin count differs from what the caller or the cache had.
    pub has_updates: bool,
    /// Poll cadence suggested to the dashboard.
    pub poll_interval_secs: u64,
}

/// Raffle view for one collector.
#[derive(Debug, Clone)]
pub struct RaffleInfo {
    /// Collector address.
    pub address: Address,
    /// Evaluated raffle status.
    pub status: RaffleStatus,
    /// Next streak milestone.
    pub next_milestone: Milestone,
    /// Suggested next action.
    pub recommendation: Recommendation,
    /// Winners of recent rounds, newest first.
    pub recent_winners: Vec<RaffleWinner>,
    /// Draw schedule.
    pub draw: DrawTiming,
}

/// Collector state after corrections, ready for the calculators.
#[derive(Debug)]
struct Loaded {
    snapshot: CollectorSnapshot,
    /// Spins with raffle claims removed; override exclusions still present.
    spins: Vec<SpinEvent>,
    /// Spins that count toward schedule, streak and totals.
    counted: Vec<SpinEvent>,
    medals: Vec<Medal>,
}

/// Orchestrates chain reads, caching and the calculators.
#[derive(Debug)]
pub struct SpinService {
    chain: Arc<dyn ChainReader>,
    store: Arc<dyn Persistence>,
    settings: SpinSettings,
    spins: TtlCache<Vec<SpinEvent>>,
    medals: TtlCache<Vec<Medal>>,
    ens_names: TtlCache<Option<String>>,
    ens_addresses: TtlCache<Option<Address>>,
    raffle: TtlCache<RaffleInfo>,
    winners: TtlCache<Vec<RaffleWinner>>,
}

fn unix(now: DateTime<Utc>) -> UnixSeconds {
    now.timestamp()
}

impl SpinService {
    /// Creates a new `SpinService`.
    #[must_use]
    pub fn new(chain: Arc<dyn ChainReader>, store: Arc<dyn Persistence>, settings: SpinSettings) -> Self {
        let policy = settings.cache.clone();
        Self {
            chain,
            store,
            spins: TtlCache::new(policy.clone()),
            medals: TtlCache::new(policy.clone()),
            ens_names: TtlCache::new(policy.clone()),
            ens_addresses: TtlCache::new(policy.clone()),
            raffle: TtlCache::new(policy.clone()),
            winners: TtlCache::new(policy),
            settings,
        }
    }

    /// The configured home collector.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotConfigured`] when `PUBLIC_ADDRESS` is unset.
    pub fn home(&self) -> Result<Address, ServiceError> {
        self.settings
            .home
            .ok_or_else(|| ServiceError::NotConfigured("PUBLIC_ADDRESS".to_string()))
    }

    /// Cron cadence in minutes.
    #[must_use]
    pub const fn cron_interval_minutes(&self) -> u32 {
        self.settings.cron_interval_minutes
    }

    fn spin_cache_slot(&self, address: &Address) -> (String, CacheKind) {
        let kind = if self.settings.home == Some(*address) {
            CacheKind::HomeSpins
        } else {
            CacheKind::WalletSpins
        };
        (format!("spins:{}", address_key(address)), kind)
    }

    fn medal_cache_key(address: &Address) -> String {
        format!("medals:{}", address_key(address))
    }

    /// Resolves a collector query to an address.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::EnsNotResolved`] for names without an address
    /// and [`ServiceError::Chain`] when ENS cannot be reached.
    pub async fn resolve(&self, query: &CollectorQuery) -> Result<Address, ServiceError> {
        let name = match query {
            CollectorQuery::Address(address) => return Ok(*address),
            CollectorQuery::Ens(name) => name,
        };
        let key = format!("ens-forward:{name}");
        let resolved = match self.ens_addresses.get(&key).await {
            Some(hit) => hit,
            None => {
                let resolved = self.chain.resolve_ens(name.clone()).await?;
                let kind = if resolved.is_some() {
                    CacheKind::Ens
                } else {
                    CacheKind::EnsFailure
                };
                self.ens_addresses.insert(key, resolved, kind).await;
                resolved
            }
        };
        resolved.ok_or_else(|| ServiceError::EnsNotResolved(name.clone()))
    }

    async fn medals_for(&self, address: Address, stack_id: U256, fresh: bool) -> Vec<Medal> {
        let key = Self::medal_cache_key(&address);
        if !fresh {
            if let Some(hit) = self.medals.get(&key).await {
                return hit;
            }
        }
        match self.chain.stack_medals(stack_id).await {
            Ok(raw) => {
                let medals = decode_medals(&raw);
                debug!(%address, %stack_id, records = raw.len(), medals = medals.len(), "medals loaded");
                self.medals.insert(key, medals.clone(), CacheKind::Medals).await;
                medals
            }
            Err(err) => {
                warn!(%address, error = %err, "medal lookup failed; continuing without medals");
                Vec::new()
            }
        }
    }

    async fn load(&self, address: Address, fresh: bool) -> Result<Loaded, ServiceError> {
        let (key, kind) = self.spin_cache_slot(&address);
        let cached = if fresh { None } else { self.spins.get(&key).await };
        let mut snapshot = self
            .chain
            .collector_snapshot(address, cached.is_none())
            .await?;

        let raw = match (snapshot.spins.take(), cached) {
            (Some(fetched), _) => {
                self.spins.insert(key, fetched.clone(), kind).await;
                fetched
            }
            (None, Some(hit)) => hit,
            (None, None) => Vec::new(),
        };

        let medals = match snapshot.stack_id {
            Some(stack_id) => self.medals_for(address, stack_id, fresh).await,
            None => Vec::new(),
        };

        let spins = strip_raffle_claims(&raw, &medals);
        let counted = self.settings.overrides.counted_spins(&address, &spins);
        Ok(Loaded {
            snapshot,
            spins,
            counted,
            medals,
        })
    }

    /// Drops cached history once a new spin may land at any moment.
    async fn refresh_if_eligible(&self, address: &Address, schedule: &ScheduleState) {
        if schedule.requires_refresh() {
            let (key, _) = self.spin_cache_slot(address);
            let dropped = self.spins.invalidate(&key).await;
            self.medals.invalidate(&Self::medal_cache_key(address)).await;
            if dropped {
                debug!(%address, "eligible; cached spins dropped");
            }
        }
    }

    fn slot_for(&self, schedule: &ScheduleState) -> Option<UnixSeconds> {
        (!schedule.can_spin_now).then(|| {
            notification_slot(schedule.next_eligible_timestamp, self.settings.cron_interval_minutes)
        })
    }

    /// Verified primary ENS name, from memory, storage or the chain.
    pub async fn ens_name_at(&self, address: Address, now: DateTime<Utc>) -> Option<String> {
        let key = address_key(&address);
        if let Some(hit) = self.ens_names.get(&key).await {
            return hit;
        }
        match self.store.cached_ens_name(address, now).await {
            Ok(Some(name)) => {
                self.ens_names.insert(key, Some(name.clone()), CacheKind::Ens).await;
                return Some(name);
            }
            Ok(None) => {}
            Err(err) => warn!(%address, error = %err, "ens cache read failed"),
        }
        match self.chain.lookup_ens(address).await {
            Ok(Some(name)) => {
                self.ens_names.insert(key, Some(name.clone()), CacheKind::Ens).await;
                let ttl = self
                    .settings
                    .cache
                    .ttl(CacheKind::Ens)
                    .and_then(|ttl| ChronoDuration::from_std(ttl).ok())
                    .unwrap_or_else(|| ChronoDuration::days(30));
                if let Err(err) = self.store.cache_ens_name(address, name.clone(), now + ttl).await {
                    warn!(%address, error = %err, "ens cache write failed");
                }
                Some(name)
            }
            Ok(None) => {
                self.ens_names.insert(key, None, CacheKind::EnsFailure).await;
                None
            }
            Err(err) => {
                warn!(%address, error = %err, "ens lookup failed");
                self.ens_names.insert(key, None, CacheKind::EnsFailure).await;
                None
            }
        }
    }

    /// Full status of `query` at `now`; records a visit when `visit` is set.
    ///
    /// # Errors
    ///
    /// Returns a [`ServiceError`] when the collector cannot be resolved or
    /// its on-chain state cannot be read.
    pub async fn collector_status_at(
        &self,
        query: &CollectorQuery,
        now: DateTime<Utc>,
        visit: Option<VisitContext>,
    ) -> Result<CollectorStatus, ServiceError> {
        let address = self.resolve(query).await?;
        let now_secs = unix(now);
        let loaded = self.load(address, false).await?;

        let schedule = ScheduleState::compute(&loaded.counted, now_secs);
        let streak = StreakState::compute(&self.settings.streak, &loaded.counted, now_secs);
        self.refresh_if_eligible(&address, &schedule).await;

        if loaded.snapshot.contract_can_spin != schedule.can_spin_now {
            debug!(
                %address,
                contract = loaded.snapshot.contract_can_spin,
                computed = schedule.can_spin_now,
                "contract and computed eligibility differ"
            );
        }

        let (excluded_spins, excluded_label) = self
            .settings
            .overrides
            .get(&address)
            .map_or((&[][..], DEFAULT_EXCLUDED_LABEL), |o| {
                (o.excluded_spins.as_slice(), o.excluded_label.as_str())
            });
        let history = build_history(&HistoryInput {
            spins: &loaded.spins,
            medals: &loaded.medals,
            excluded_spins,
            excluded_label,
            extra_raffle_wins: self.settings.overrides.extra_raffle_wins(&address),
            max_streak_gap_secs: self.settings.streak.max_gap_secs,
        });

        let ens_name = match query {
            CollectorQuery::Ens(name) => Some(name.clone()),
            CollectorQuery::Address(_) => self.ens_name_at(address, now).await,
        };
        let medal_stats = MedalStats::from_medals(&loaded.medals);
        let raffle = RaffleStatus::evaluate(&loaded.snapshot.raffle, streak.current_streak_days);

        let status = CollectorStatus {
            address,
            ens_name,
            stack_id: loaded.snapshot.stack_id,
            schedule,
            streak,
            contract_can_spin: loaded.snapshot.contract_can_spin,
            medal_stats,
            medals: loaded.medals,
            history,
            raffle,
            notification_slot: self.slot_for(&schedule),
            poll_interval_secs: suggested_poll_interval_secs(&schedule, now_secs),
            computed_at: now_secs,
        };

        info!(
            %address,
            spin_count = status.schedule.spin_count,
            can_spin_now = status.schedule.can_spin_now,
            streak = status.streak.current_streak_days,
            "collector status computed"
        );

        if let Some(ctx) = visit {
            self.record_visit(&status, ctx, now).await;
        }
        Ok(status)
    }

    /// [`SpinService::collector_status_at`] for the home collector.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotConfigured`] without a home collector, or
    /// any error of the underlying query.
    pub async fn home_status_at(&self, now: DateTime<Utc>) -> Result<CollectorStatus, ServiceError> {
        let home = self.home()?;
        self.collector_status_at(&CollectorQuery::Address(home), now, None)
            .await
    }

    async fn record_visit(&self, status: &CollectorStatus, ctx: VisitContext, now: DateTime<Utc>) {
        let visit = WalletVisit {
            address: status.address,
            ens_name: status.ens_name.clone(),
            ip_address: ctx.ip_address,
            user_agent: ctx.user_agent,
            referrer: ctx.referrer,
            spin_count: status.schedule.spin_count as u64,
            medal_count: status.medal_stats.total,
            stack_id: status.stack_id.map(|id| id.to_string()),
            can_spin_now: status.schedule.can_spin_now,
            last_spin_timestamp: status.schedule.last_spin_timestamp,
            visited_at: now,
        };
        if let Err(err) = self.store.record_visit(visit).await {
            warn!(address = %status.address, error = %err, "visit tracking failed");
        }
    }

    /// Schedule view for `address`; `fresh` bypasses the spin cache.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Chain`] when the collector cannot be read.
    pub async fn schedule_for_at(
        &self,
        address: Address,
        now: DateTime<Utc>,
        fresh: bool,
    ) -> Result<ScheduleView, ServiceError> {
        let now_secs = unix(now);
        let loaded = self.load(address, fresh).await?;
        let schedule = ScheduleState::compute(&loaded.counted, now_secs);
        let streak = StreakState::compute(&self.settings.streak, &loaded.counted, now_secs);
        self.refresh_if_eligible(&address, &schedule).await;
        Ok(ScheduleView {
            address,
            schedule,
            streak,
            seconds_until_eligible: schedule.seconds_until_eligible(now_secs),
            notification_slot: self.slot_for(&schedule),
            poll_interval_secs: suggested_poll_interval_secs(&schedule, now_secs),
            computed_at: now_secs,
        })
    }

    /// Schedule view of the home collector.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotConfigured`] without a home collector.
    pub async fn home_schedule_at(&self, now: DateTime<Utc>) -> Result<ScheduleView, ServiceError> {
        self.schedule_for_at(self.home()?, now, false).await
    }

    /// Cheap change check for the home collector.
    ///
    /// Reads fresh spins, compares the count with `known_spin_count` (or the
    /// cached list when the caller sent none) and refreshes the cache.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotConfigured`] without a home collector and
    /// [`ServiceError::Chain`] when the spins cannot be read.
    pub async fn check_updates_at(
        &self,
        known_spin_count: Option<usize>,
        now: DateTime<Utc>,
    ) -> Result<UpdateCheck, ServiceError> {
        let home = self.home()?;
        let now_secs = unix(now);
        let (key, kind) = self.spin_cache_slot(&home);
        let previous = self.spins.get(&key).await;
        let fresh = self.chain.spins(home).await?;

        let counted_now = self.settings.overrides.counted_spins(&home, &fresh);
        let baseline = known_spin_count.or_else(|| {
            previous
                .as_deref()
                .map(|p| self.settings.overrides.counted_spins(&home, p).len())
        });
        let has_updates = baseline.is_some_and(|n| n != counted_now.len());
        self.spins.insert(key, fresh, kind).await;

        let schedule = ScheduleState::compute(&counted_now, now_secs);
        Ok(UpdateCheck {
            spin_count: schedule.spin_count,
            can_spin_now: schedule.can_spin_now,
            last_spin_timestamp: schedule.last_spin_timestamp,
            has_updates,
            poll_interval_secs: suggested_poll_interval_secs(&schedule, now_secs),
        })
    }

    async fn recent_winners(&self, current_round: u64) -> Vec<RaffleWinner> {
        let rounds = recent_rounds(current_round, RECENT_RAFFLE_ROUNDS);
        if rounds.is_empty() {
            return Vec::new();
        }
        let key = format!("winners:{current_round}");
        if let Some(hit) = self.winners.get(&key).await {
            return hit;
        }

        let mut winners = match self.store.known_winners(rounds.clone()).await {
            Ok(known) => known,
            Err(err) => {
                warn!(error = %err, "stored raffle winners unavailable");
                Vec::new()
            }
        };
        let missing: Vec<u64> = rounds
            .into_iter()
            .filter(|round| !winners.iter().any(|w| w.round == *round))
            .collect();
        if !missing.is_empty() {
            match self.chain.raffle_winners(missing).await {
                Ok(fetched) => {
                    if let Err(err) = self.store.save_winners(fetched.clone()).await {
                        warn!(error = %err, "saving raffle winners failed");
                    }
                    winners.extend(fetched);
                }
                Err(err) => warn!(error = %err, "raffle winner lookup failed"),
            }
        }
        winners.sort_by_key(|w| std::cmp::Reverse(w.round));
        self.winners
            .insert(key, winners.clone(), CacheKind::RaffleHistory)
            .await;
        winners
    }

    /// Raffle view for `query`.
    ///
    /// A collector whose state cannot be read gets a placeholder status
    /// carrying the error instead of a failure.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidCollector`] or
    /// [`ServiceError::EnsNotResolved`] for unusable queries.
    pub async fn raffle_info_at(
        &self,
        query: &CollectorQuery,
        now: DateTime<Utc>,
    ) -> Result<RaffleInfo, ServiceError> {
        let address = self.resolve(query).await?;
        let key = format!("raffle:{}", address_key(&address));
        if let Some(hit) = self.raffle.get(&key).await {
            return Ok(hit);
        }

        let now_secs = unix(now);
        let (status, snapshot): (RaffleStatus, Option<RaffleSnapshot>) =
            match self.load(address, false).await {
                Ok(loaded) => {
                    let streak =
                        StreakState::compute(&self.settings.streak, &loaded.counted, now_secs);
                    (
                        RaffleStatus::evaluate(&loaded.snapshot.raffle, streak.current_streak_days),
                        Some(loaded.snapshot.raffle),
                    )
                }
                Err(err) => {
                    warn!(%address, error = %err, "raffle status unavailable");
                    (RaffleStatus::unavailable(0, err.to_string()), None)
                }
            };

        let recent_winners = match snapshot {
            Some(s) => self.recent_winners(s.current_round).await,
            None => Vec::new(),
        };
        let info = RaffleInfo {
            address,
            next_milestone: status.next_milestone(),
            recommendation: status.recommendation(),
            status,
            recent_winners,
            draw: DrawTiming::unscheduled(),
        };
        if snapshot.is_some() {
            self.raffle
                .insert(key, info.clone(), CacheKind::RaffleStatus)
                .await;
        }
        Ok(info)
    }

    /// Raffle view of the home collector.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotConfigured`] without a home collector.
    pub async fn home_raffle_at(&self, now: DateTime<Utc>) -> Result<RaffleInfo, ServiceError> {
        let home = self.home()?;
        self.raffle_info_at(&CollectorQuery::Address(home), now).await
    }

    /// Sweeps expired entries from every cache; returns how many went.
    pub async fn purge_caches(&self) -> usize {
        self.spins.purge_expired().await
            + self.medals.purge_expired().await
            + self.ens_names.purge_expired().await
            + self.ens_addresses.purge_expired().await
            + self.raffle.purge_expired().await
            + self.winners.purge_expired().await
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::atomic::Ordering;

    use chrono::TimeZone;

    use super::*;
    use crate::domain::activity::ActivityKind;
    use crate::domain::medal::MedalTier;
    use crate::persistence::MemoryPersistence;
    use crate::service::testing::{FakeChain, HOME, medal_record, raffle, spin};

    const T: i64 = 1_757_001_600;
    const HOUR: i64 = 3_600;

    fn at(ts: i64) -> DateTime<Utc> {
        let Some(dt) = Utc.timestamp_opt(ts, 0).single() else {
            panic!("valid timestamp");
        };
        dt
    }

    fn service_with(chain: &Arc<FakeChain>, overrides: OverrideTable) -> (SpinService, Arc<MemoryPersistence>) {
        let store = Arc::new(MemoryPersistence::new());
        let service = SpinService::new(
            Arc::clone(chain) as Arc<dyn ChainReader>,
            Arc::clone(&store) as Arc<dyn Persistence>,
            SpinSettings {
                home: Some(HOME),
                streak: StreakPolicy::default(),
                overrides,
                cache: CachePolicy::default(),
                cron_interval_minutes: 10,
            },
        );
        (service, store)
    }

    #[tokio::test]
    async fn cooling_down_status_uses_cache() {
        let chain = Arc::new(FakeChain::default());
        chain.set_spins(HOME, vec![spin(T - 2 * HOUR + 30)]).await;
        let (service, _) = service_with(&chain, OverrideTable::default());

        let Ok(first) = service.home_status_at(at(T)).await else {
            panic!("status");
        };
        assert!(!first.schedule.can_spin_now);
        assert_eq!(first.schedule.next_eligible_timestamp, T + 22 * HOUR + 60);
        assert_eq!(first.notification_slot, Some(T + 22 * HOUR + 600));
        let _ = service.home_status_at(at(T + 60)).await;
        assert_eq!(chain.spin_reads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn eligibility_drops_cached_spins() {
        let chain = Arc::new(FakeChain::default());
        chain.set_spins(HOME, vec![spin(T - 25 * HOUR)]).await;
        let (service, _) = service_with(&chain, OverrideTable::default());

        let Ok(status) = service.home_status_at(at(T)).await else {
            panic!("status");
        };
        assert!(status.schedule.can_spin_now);
        assert!(status.schedule.next_eligible_timestamp <= T);

        chain.set_spins(HOME, vec![spin(T - 25 * HOUR), spin(T + 30)]).await;
        let Ok(after) = service.home_status_at(at(T + 60)).await else {
            panic!("status after spin");
        };
        assert_eq!(after.schedule.spin_count, 2);
        assert!(!after.schedule.can_spin_now);
        assert_eq!(chain.spin_reads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn overrides_and_raffle_claims_shape_history() {
        let chain = Arc::new(FakeChain::default());
        let stack = U256::from(77_u64);
        let spins = vec![
            spin(T - 60 * HOUR),
            spin(T - 48 * HOUR),
            spin(T - 47 * HOUR),
            spin(T - 20 * HOUR),
        ];
        chain.set_spins(HOME, spins).await;
        {
            let mut state = chain.state.write().await;
            state.stack_ids.insert(HOME, stack);
            state.medals.insert(
                stack,
                vec![
                    medal_record(1, T - 60 * HOUR + 5),
                    medal_record(4, T - 47 * HOUR + 10),
                    medal_record(2, T - 20 * HOUR + 5),
                ],
            );
        }
        let overrides = OverrideTable::from_json(&format!(
            r#"[{{"address":"{HOME}","excluded_spins":[{}]}}]"#,
            T - 48 * HOUR
        ));
        let Ok(overrides) = overrides else {
            panic!("override table");
        };
        let (service, _) = service_with(&chain, overrides);

        let Ok(status) = service.home_status_at(at(T)).await else {
            panic!("status");
        };
        assert_eq!(status.schedule.spin_count, 2);
        assert_eq!(status.medal_stats.total, 2);
        assert_eq!(status.streak.current_streak_days, 2);
        assert!(!status.streak.at_risk);

        let kinds: Vec<&ActivityKind> = status.history.iter().map(|a| &a.kind).collect();
        assert!(kinds.iter().any(|k| matches!(k, ActivityKind::ExcludedSpin { label } if label == "Contract Spin")));
        assert!(kinds.iter().any(|k| matches!(k, ActivityKind::RaffleWin { tier: MedalTier::Black })));
        assert!(matches!(
            status.history.first().map(|a| &a.kind),
            Some(ActivityKind::Spin { number: 2, .. })
        ));
    }

    #[tokio::test]
    async fn ens_queries_resolve_and_visits_are_recorded() {
        let chain = Arc::new(FakeChain::default());
        let who = Address::repeat_byte(0x22);
        chain.set_spins(who, Vec::new()).await;
        chain.state.write().await.ens.insert(who, "alice.eth".into());
        let (service, store) = service_with(&chain, OverrideTable::default());

        let Ok(query) = "Alice.ETH".parse::<CollectorQuery>() else {
            panic!("query parses");
        };
        let Ok(status) = service
            .collector_status_at(&query, at(T), Some(VisitContext::default()))
            .await
        else {
            panic!("status");
        };
        assert_eq!(status.address, who);
        assert!(status.schedule.can_spin_now);
        assert_eq!(status.poll_interval_secs, 120);
        let Ok(Some(row)) = store.wallet(who).await else {
            panic!("visit recorded");
        };
        assert_eq!(row.visit_count, 1);

        let Ok(missing) = "nobody.eth".parse::<CollectorQuery>() else {
            panic!("query parses");
        };
        assert!(matches!(
            service.collector_status_at(&missing, at(T), None).await,
            Err(ServiceError::EnsNotResolved(_))
        ));
    }

    #[tokio::test]
    async fn reverse_ens_is_persisted() {
        let chain = Arc::new(FakeChain::default());
        chain.state.write().await.ens.insert(HOME, "home.eth".into());
        let (service, store) = service_with(&chain, OverrideTable::default());
        assert_eq!(service.ens_name_at(HOME, at(T)).await.as_deref(), Some("home.eth"));
        assert!(matches!(store.cached_ens_name(HOME, at(T)).await, Ok(Some(ref n)) if n == "home.eth"));
    }

    #[tokio::test]
    async fn update_check_compares_counts() {
        let chain = Arc::new(FakeChain::default());
        chain.set_spins(HOME, vec![spin(T - 3 * HOUR)]).await;
        let (service, _) = service_with(&chain, OverrideTable::default());

        let Ok(first) = service.check_updates_at(None, at(T)).await else {
            panic!("check");
        };
        assert!(!first.has_updates);
        assert_eq!(first.poll_interval_secs, 300);

        chain.set_spins(HOME, vec![spin(T - 3 * HOUR), spin(T)]).await;
        let Ok(second) = service.check_updates_at(None, at(T + 10)).await else {
            panic!("check");
        };
        assert!(second.has_updates);
        assert_eq!(second.spin_count, 2);

        let Ok(third) = service.check_updates_at(Some(2), at(T + 20)).await else {
            panic!("check");
        };
        assert!(!third.has_updates);
    }

    #[tokio::test]
    async fn raffle_info_merges_stored_and_fresh_winners() {
        let chain = Arc::new(FakeChain::default());
        let daily: Vec<SpinEvent> = (0..8).map(|d| spin(T - d * 24 * HOUR)).collect();
        chain.set_spins(HOME, daily).await;
        {
            let mut state = chain.state.write().await;
            state.raffle = Some(raffle(6));
            state.winners.insert(5, Address::repeat_byte(5));
            state.winners.insert(4, Address::repeat_byte(4));
        }
        let (service, store) = service_with(&chain, OverrideTable::default());
        let _ = store
            .save_winners(vec![RaffleWinner {
                round: 3,
                winner: Address::repeat_byte(3),
            }])
            .await;

        let Ok(info) = service.home_raffle_at(at(T + 60)).await else {
            panic!("raffle info");
        };
        assert!(info.status.is_eligible);
        assert!(info.status.can_enter);
        assert_eq!(info.recommendation, Recommendation::EnterRaffle);
        let rounds: Vec<u64> = info.recent_winners.iter().map(|w| w.round).collect();
        assert_eq!(rounds, vec![5, 4, 3]);
        let Ok(stored) = store.known_winners(vec![4, 5]).await else {
            panic!("stored winners");
        };
        assert_eq!(stored.len(), 2);
    }

    #[tokio::test]
    async fn raffle_info_degrades_when_chain_fails() {
        let chain = Arc::new(FakeChain::default());
        chain.fail_snapshot.store(true, Ordering::SeqCst);
        let (service, _) = service_with(&chain, OverrideTable::default());
        let Ok(info) = service.home_raffle_at(at(T)).await else {
            panic!("placeholder info");
        };
        assert!(info.status.error.is_some());
        assert!(info.recent_winners.is_empty());
    }

    #[tokio::test]
    async fn missing_home_is_reported() {
        let chain = Arc::new(FakeChain::default());
        let service = SpinService::new(
            Arc::clone(&chain) as Arc<dyn ChainReader>,
            Arc::new(MemoryPersistence::new()),
            SpinSettings {
                home: None,
                streak: StreakPolicy::default(),
                overrides: OverrideTable::default(),
                cache: CachePolicy::default(),
                cron_interval_minutes: 10,
            },
        );
        assert!(matches!(
            service.home_schedule_at(at(T)).await,
            Err(ServiceError::NotConfigured(_))
        ));
    }
}
