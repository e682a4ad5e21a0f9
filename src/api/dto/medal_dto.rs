//! Global medal statistics DTOs.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::global_stats::{GlobalMedalStats, MedalCounts};
use crate::service::ScanReport;

/// Network-wide medal counters.
#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
pub struct MedalCountsDto {
    /// Bronze.
    pub bronze: u64,
    /// Silver.
    pub silver: u64,
    /// Gold.
    pub gold: u64,
    /// Black.
    pub black: u64,
    /// All Medal Spin medals.
    pub total: u64,
}

impl From<MedalCounts> for MedalCountsDto {
    fn from(c: MedalCounts) -> Self {
        Self {
            bronze: c.bronze,
            silver: c.silver,
            gold: c.gold,
            black: c.black,
            total: c.total,
        }
    }
}

/// Response for `GET /api/v1/medals/global`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GlobalMedalStatsResponse {
    /// Counters.
    pub counts: MedalCountsDto,
    /// Last block included.
    pub last_indexed_block: u64,
    /// Medal events seen, any project.
    pub total_events: u64,
    /// Last write.
    pub last_updated: Option<DateTime<Utc>>,
    /// `empty` or `incremental_update`.
    pub source: String,
    /// A background refresh was due.
    pub stale: bool,
}

impl GlobalMedalStatsResponse {
    /// Renders counters read at `now`.
    #[must_use]
    pub fn new(stats: &GlobalMedalStats, now: DateTime<Utc>, refresh_after_secs: i64) -> Self {
        Self {
            counts: stats.counts.into(),
            last_indexed_block: stats.last_indexed_block,
            total_events: stats.total_events,
            last_updated: stats.last_updated,
            source: stats.source.as_str().to_string(),
            stale: stats.is_stale(now, refresh_after_secs),
        }
    }
}

/// Response for `POST /api/v1/cron/update-global-medals`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ScanReportResponse {
    /// First block scanned.
    pub from_block: u64,
    /// Last block scanned.
    pub to_block: u64,
    /// Medal logs seen.
    pub events_seen: u64,
    /// Medal Spin medals counted.
    pub medals_counted: u64,
    /// Stopped early; the next run resumes from `to_block + 1`.
    pub partial: bool,
    /// Counters after the scan.
    pub counts: MedalCountsDto,
}

impl From<&ScanReport> for ScanReportResponse {
    fn from(r: &ScanReport) -> Self {
        Self {
            from_block: r.from_block,
            to_block: r.to_block,
            events_seen: r.events_seen,
            medals_counted: r.medals_counted,
            partial: r.partial,
            counts: r.stats.counts.into(),
        }
    }
}
