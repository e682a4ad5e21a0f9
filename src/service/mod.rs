//! Service layer: business logic orchestration.
//!
//! [`SpinService`] turns chain snapshots into schedule, streak, medal and
//! raffle views behind a TTL cache. [`NotifyService`] drives the "spin
//! ready" texts and [`MedalService`] maintains the global medal counters.

pub mod medal_service;
pub mod notify_service;
pub mod spin_service;

#[cfg(test)]
pub(crate) mod testing;

pub use medal_service::{MedalService, ScanReport};
pub use notify_service::{NotifyReport, NotifyService, TestNotification};
pub use spin_service::{
    CollectorStatus, RaffleInfo, ScheduleView, SpinService, SpinSettings, UpdateCheck, VisitContext,
};
