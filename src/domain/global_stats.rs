//! Network-wide Medal Spin medal counters built from Stack NFT logs.

use alloy::primitives::U256;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::medal::{MedalMetadata, MedalTier};

/// Block at which the medal index starts when nothing is stored yet.
pub const MEDAL_INDEX_START_BLOCK: u64 = 17_000_000;

/// Largest block range requested per `eth_getLogs` call.
pub const LOG_CHUNK_BLOCKS: u64 = 9_000;

/// Start of a JSON object whose first key is `projectId`.
const METADATA_PREFIX: &[u8] = br#"{"projectI"#;

/// Medal counters across all collectors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedalCounts {
    /// Bronze medals.
    pub bronze: u64,
    /// Silver medals.
    pub silver: u64,
    /// Gold medals.
    pub gold: u64,
    /// Black medals.
    pub black: u64,
    /// All Medal Spin medals, including ones with an unrecognised tier.
    pub total: u64,
}

impl MedalCounts {
    /// Counts one medal.
    pub fn record(&mut self, tier: Option<MedalTier>) {
        match tier {
            Some(MedalTier::Bronze) => self.bronze += 1,
            Some(MedalTier::Silver) => self.silver += 1,
            Some(MedalTier::Gold) => self.gold += 1,
            Some(MedalTier::Black) => self.black += 1,
            None => {}
        }
        self.total += 1;
    }
}

/// How the stored counters were produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatsSource {
    /// Nothing indexed yet.
    Empty,
    /// Incremental log scan.
    IncrementalUpdate,
}

impl StatsSource {
    /// Storage tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::IncrementalUpdate => "incremental_update",
        }
    }

    /// Parses a storage tag; unknown tags read as [`StatsSource::Empty`].
    #[must_use]
    pub fn parse(tag: &str) -> Self {
        match tag {
            "incremental_update" => Self::IncrementalUpdate,
            _ => Self::Empty,
        }
    }
}

/// Persisted global medal statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalMedalStats {
    /// Medal counters.
    pub counts: MedalCounts,
    /// Last block included in the counters.
    pub last_indexed_block: u64,
    /// Medal events seen, including foreign projects.
    pub total_events: u64,
    /// When the counters were last written.
    pub last_updated: Option<DateTime<Utc>>,
    /// Origin of the counters.
    pub source: StatsSource,
}

impl Default for GlobalMedalStats {
    fn default() -> Self {
        Self {
            counts: MedalCounts::default(),
            last_indexed_block: MEDAL_INDEX_START_BLOCK,
            total_events: 0,
            last_updated: None,
            source: StatsSource::Empty,
        }
    }
}

impl GlobalMedalStats {
    /// `true` when the counters are older than `max_age_secs` at `now`.
    #[must_use]
    pub fn is_stale(&self, now: DateTime<Utc>, max_age_secs: i64) -> bool {
        self.last_updated
            .is_none_or(|at| (now - at).num_seconds() > max_age_secs)
    }
}

/// Medal extracted from a Stack NFT medal log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedMedal {
    /// Receiving stack.
    pub stack_id: U256,
    /// Tier inferred from the metadata id.
    pub tier: Option<MedalTier>,
    /// Display name.
    pub name: String,
}

/// Pulls a Medal Spin medal out of raw log data.
///
/// The first word is the stack id. Metadata JSON sits somewhere in the
/// dynamic tail and runs until the first NUL byte.
#[must_use]
pub fn extract_logged_medal(data: &[u8]) -> Option<LoggedMedal> {
    let start = data
        .windows(METADATA_PREFIX.len())
        .position(|w| w == METADATA_PREFIX)?;
    let tail = data.get(start..)?;
    let end = tail.iter().position(|&b| b == 0).unwrap_or(tail.len());
    let json = std::str::from_utf8(tail.get(..end)?).ok()?;
    let meta: MedalMetadata = serde_json::from_str(json).ok()?;
    if !meta.is_medal_spin() {
        return None;
    }
    let stack_id = data.get(..32).map(U256::from_be_slice).unwrap_or_default();
    Some(LoggedMedal {
        stack_id,
        tier: meta.id.as_deref().and_then(MedalTier::from_metadata_id),
        name: meta.display_name(),
    })
}

/// Splits `[from, to]` into inclusive ranges of at most `chunk` blocks.
#[must_use]
pub fn block_chunks(from: u64, to: u64, chunk: u64) -> Vec<(u64, u64)> {
    let chunk = chunk.max(1);
    let mut ranges = Vec::new();
    let mut start = from;
    while start <= to {
        let end = start.saturating_add(chunk - 1).min(to);
        ranges.push((start, end));
        match end.checked_add(1) {
            Some(next) => start = next,
            None => break,
        }
    }
    ranges
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn log_data(stack_id: u64, json: &str) -> Vec<u8> {
        let mut data = U256::from(stack_id).to_be_bytes::<32>().to_vec();
        data.extend_from_slice(&[0_u8; 64]);
        data.extend_from_slice(json.as_bytes());
        data.extend_from_slice(&[0_u8; 7]);
        data
    }

    #[test]
    fn extracts_medal_spin_logs() {
        let data = log_data(42, r#"{"projectId":"MEDAL-SPIN","id":"medal-spin-silver","name":"Silver"}"#);
        let Some(medal) = extract_logged_medal(&data) else {
            panic!("medal extracted");
        };
        assert_eq!(medal.stack_id, U256::from(42_u64));
        assert_eq!(medal.tier, Some(MedalTier::Silver));
        assert_eq!(medal.name, "Silver");
    }

    #[test]
    fn ignores_foreign_and_garbage_logs() {
        assert!(extract_logged_medal(&log_data(1, r#"{"projectId":"OTHER","id":"gold"}"#)).is_none());
        assert!(extract_logged_medal(&[0_u8; 96]).is_none());
        assert!(extract_logged_medal(&log_data(1, r#"{"projectId":"MEDAL-SPIN""#)).is_none());
    }

    #[test]
    fn counts_track_tiers_and_total() {
        let mut counts = MedalCounts::default();
        counts.record(Some(MedalTier::Gold));
        counts.record(Some(MedalTier::Black));
        counts.record(None);
        assert_eq!((counts.gold, counts.black, counts.total), (1, 1, 3));
    }

    #[test]
    fn chunking_covers_range() {
        assert_eq!(block_chunks(10, 25, 9), vec![(10, 18), (19, 25)]);
        assert_eq!(block_chunks(5, 5, 9_000), vec![(5, 5)]);
        assert!(block_chunks(6, 5, 9_000).is_empty());
    }

    #[test]
    fn staleness() {
        let now = Utc::now();
        let fresh = GlobalMedalStats {
            last_updated: Some(now - chrono::Duration::minutes(10)),
            ..GlobalMedalStats::default()
        };
        assert!(!fresh.is_stale(now, 3_600));
        assert!(GlobalMedalStats::default().is_stale(now, 3_600));
    }
}
