//! Network-wide Medal Spin medal counters.
//!
//! Counters are persisted together with the last indexed block. Each scan
//! resumes one block after it and walks medal logs in fixed-size chunks.
//! Reading stale counters kicks off a scan in the background. At most one
//! background scan runs at a time, and a new one waits out
//! [`SCAN_RETRY_SECS`] after the previous attempt.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::cache::{CacheKind, CachePolicy, TtlCache};
use crate::chain::ChainReader;
use crate::domain::global_stats::{
    GlobalMedalStats, LOG_CHUNK_BLOCKS, StatsSource, block_chunks, extract_logged_medal,
};
use crate::error::ServiceError;
use crate::persistence::Persistence;

const STATS_KEY: &str = "global";

/// Minimum spacing between two background scans.
pub const SCAN_RETRY_SECS: i64 = 5 * 60;

/// Result of one incremental scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanReport {
    /// First block scanned.
    pub from_block: u64,
    /// Last block scanned.
    pub to_block: u64,
    /// Medal logs seen, any project.
    pub events_seen: u64,
    /// Medal Spin medals counted.
    pub medals_counted: u64,
    /// Stopped early on an RPC failure.
    pub partial: bool,
    /// Counters after the scan.
    pub stats: GlobalMedalStats,
}

/// Loads, refreshes and caches [`GlobalMedalStats`].
#[derive(Debug)]
pub struct MedalService {
    chain: Arc<dyn ChainReader>,
    store: Arc<dyn Persistence>,
    cache: TtlCache<GlobalMedalStats>,
    refresh_after_secs: i64,
    scan_lock: Mutex<()>,
    scan_in_flight: AtomicBool,
    last_scan_attempt: AtomicI64,
}

impl MedalService {
    /// Creates a new `MedalService`.
    #[must_use]
    pub fn new(
        chain: Arc<dyn ChainReader>,
        store: Arc<dyn Persistence>,
        policy: CachePolicy,
        refresh_after_secs: i64,
    ) -> Self {
        Self {
            chain,
            store,
            cache: TtlCache::new(policy),
            refresh_after_secs,
            scan_lock: Mutex::new(()),
            scan_in_flight: AtomicBool::new(false),
            last_scan_attempt: AtomicI64::new(i64::MIN),
        }
    }

    /// Current counters. Stale counters are returned as they are while a
    /// background scan refreshes them.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Persistence`] when storage cannot be read.
    pub async fn global_stats_at(self: &Arc<Self>, now: DateTime<Utc>) -> Result<GlobalMedalStats, ServiceError> {
        let stats = match self.cache.get(STATS_KEY).await {
            Some(hit) => hit,
            None => {
                let stored = self.store.load_global_stats().await?.unwrap_or_default();
                self.cache
                    .insert(STATS_KEY, stored, CacheKind::GlobalStats)
                    .await;
                stored
            }
        };

        if stats.is_stale(now, self.refresh_after_secs) {
            self.spawn_refresh(now);
        }
        Ok(stats)
    }

    fn spawn_refresh(self: &Arc<Self>, now: DateTime<Utc>) {
        let ts = now.timestamp();
        if ts.saturating_sub(self.last_scan_attempt.load(Ordering::Acquire)) < SCAN_RETRY_SECS {
            return;
        }
        if self
            .scan_in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        self.last_scan_attempt.store(ts, Ordering::Release);

        let this = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(err) = this.update_at(Utc::now()).await {
                warn!(error = %err, "background medal scan failed");
            }
            this.scan_in_flight.store(false, Ordering::Release);
        });
    }

    /// Scans medal logs from the block after the last indexed one up to the
    /// chain head. Scans never overlap.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Chain`] when the head or the first chunk
    /// cannot be read, and [`ServiceError::Persistence`] when counters
    /// cannot be stored.
    pub async fn update_at(&self, now: DateTime<Utc>) -> Result<ScanReport, ServiceError> {
        let _guard = self.scan_lock.lock().await;
        let mut stats = self.store.load_global_stats().await?.unwrap_or_default();
        let head = self.chain.block_number().await?;
        let from_block = stats.last_indexed_block.saturating_add(1);

        let mut events_seen = 0_u64;
        let mut medals_counted = 0_u64;
        let mut partial = false;

        for (start, end) in block_chunks(from_block, head, LOG_CHUNK_BLOCKS) {
            let logs = match self.chain.medal_logs(start, end).await {
                Ok(logs) => logs,
                Err(err) if start == from_block => return Err(err),
                Err(err) => {
                    warn!(start, end, error = %err, "medal log chunk failed; saving progress");
                    partial = true;
                    break;
                }
            };
            for data in &logs {
                events_seen += 1;
                if let Some(medal) = extract_logged_medal(data) {
                    stats.counts.record(medal.tier);
                    medals_counted += 1;
                }
            }
            stats.last_indexed_block = end;
        }

        stats.total_events = stats.total_events.saturating_add(events_seen);
        stats.last_updated = Some(now);
        stats.source = StatsSource::IncrementalUpdate;
        self.store.save_global_stats(stats).await?;
        self.cache
            .insert(STATS_KEY, stats, CacheKind::GlobalStats)
            .await;

        info!(
            from_block,
            to_block = stats.last_indexed_block,
            events_seen,
            medals_counted,
            partial,
            "global medal stats updated"
        );
        Ok(ScanReport {
            from_block,
            to_block: stats.last_indexed_block,
            events_seen,
            medals_counted,
            partial,
            stats,
        })
    }

    /// Sweeps expired cache entries.
    pub async fn purge_cache(&self) -> usize {
        self.cache.purge_expired().await
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::time::Duration;

    use alloy::primitives::{Bytes, U256};

    use super::*;
    use crate::domain::global_stats::MEDAL_INDEX_START_BLOCK;
    use crate::persistence::MemoryPersistence;
    use crate::service::testing::FakeChain;

    const START: u64 = MEDAL_INDEX_START_BLOCK;

    fn log(stack: u64, project: &str, id: &str) -> Bytes {
        let mut data = U256::from(stack).to_be_bytes::<32>().to_vec();
        data.extend_from_slice(&[0_u8; 64]);
        data.extend_from_slice(format!(r#"{{"projectId":"{project}","id":"{id}","name":"{id}"}}"#).as_bytes());
        data.extend_from_slice(&[0_u8; 5]);
        Bytes::from(data)
    }

    async fn setup() -> (Arc<FakeChain>, Arc<MemoryPersistence>, Arc<MedalService>) {
        let chain = Arc::new(FakeChain::default());
        {
            let mut state = chain.state.write().await;
            state.head = START + 12_000;
            state.logs = vec![
                (START + 100, log(1, "MEDAL-SPIN", "medal-spin-silver")),
                (START + 5_000, log(2, "OTHER", "gold")),
                (START + 10_000, log(3, "MEDAL-SPIN", "medal-spin-gold")),
            ];
        }
        let store = Arc::new(MemoryPersistence::new());
        let service = Arc::new(MedalService::new(
            Arc::clone(&chain) as Arc<dyn ChainReader>,
            Arc::clone(&store) as Arc<dyn Persistence>,
            CachePolicy::default(),
            3_600,
        ));
        (chain, store, service)
    }

    #[tokio::test]
    async fn scan_resumes_after_last_indexed_block() {
        let (_chain, store, service) = setup().await;

        let Ok(report) = service.update_at(Utc::now()).await else {
            panic!("scan");
        };
        assert_eq!(report.from_block, START + 1);
        assert_eq!(report.to_block, START + 12_000);
        assert_eq!(report.events_seen, 3);
        assert_eq!(report.medals_counted, 2);
        assert!(!report.partial);
        assert_eq!((report.stats.counts.silver, report.stats.counts.gold), (1, 1));
        assert_eq!(report.stats.source, StatsSource::IncrementalUpdate);

        let Ok(Some(saved)) = store.load_global_stats().await else {
            panic!("saved stats");
        };
        assert_eq!(saved.last_indexed_block, START + 12_000);

        let Ok(again) = service.update_at(Utc::now()).await else {
            panic!("second scan");
        };
        assert_eq!(again.events_seen, 0);
        assert_eq!(again.stats.counts.total, 2);
        assert_eq!(again.stats.total_events, 3);
    }

    #[tokio::test]
    async fn failed_chunk_saves_progress() {
        let (chain, store, service) = setup().await;
        chain
            .fail_logs_from
            .store(START + LOG_CHUNK_BLOCKS + 1, Ordering::SeqCst);

        let Ok(report) = service.update_at(Utc::now()).await else {
            panic!("partial scan");
        };
        assert!(report.partial);
        assert_eq!(report.to_block, START + LOG_CHUNK_BLOCKS);
        assert_eq!(report.medals_counted, 1);
        let Ok(Some(saved)) = store.load_global_stats().await else {
            panic!("saved stats");
        };
        assert_eq!(saved.last_indexed_block, START + LOG_CHUNK_BLOCKS);
    }

    #[tokio::test]
    async fn failed_first_chunk_is_an_error() {
        let (chain, store, service) = setup().await;
        chain.fail_logs_from.store(START, Ordering::SeqCst);
        assert!(matches!(
            service.update_at(Utc::now()).await,
            Err(ServiceError::Chain(_))
        ));
        assert!(matches!(store.load_global_stats().await, Ok(None)));
    }

    #[tokio::test]
    async fn stale_reads_share_one_background_scan() {
        let (chain, _store, service) = setup().await;
        chain.fail_logs_from.store(START, Ordering::SeqCst);
        let now = Utc::now();

        for offset in [0, 10, 60] {
            let Ok(stats) = service
                .global_stats_at(now + chrono::Duration::seconds(offset))
                .await
            else {
                panic!("stats");
            };
            assert_eq!(stats.source, StatsSource::Empty);
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(chain.head_reads.load(Ordering::SeqCst), 1);

        let _ = service
            .global_stats_at(now + chrono::Duration::seconds(SCAN_RETRY_SECS + 1))
            .await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(chain.head_reads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn fresh_stats_come_from_storage() {
        let (_chain, store, service) = setup().await;
        let now = Utc::now();
        let mut stored = GlobalMedalStats {
            last_indexed_block: START + 50,
            last_updated: Some(now),
            source: StatsSource::IncrementalUpdate,
            ..GlobalMedalStats::default()
        };
        stored.counts.record(None);
        let _ = store.save_global_stats(stored).await;

        let Ok(stats) = service.global_stats_at(now).await else {
            panic!("stats");
        };
        assert_eq!(stats, stored);
        assert_eq!(service.purge_cache().await, 0);
    }
}
