//! Domain layer: spin events, the schedule and streak calculators, and the
//! medal and raffle rules layered on top of them.
//!
//! Everything here is synchronous and free of I/O. Chain reads, caching and
//! notification delivery live in the outer layers and hand this module
//! plain snapshots plus an explicit `now`.

pub mod activity;
pub mod collector;
pub mod global_stats;
pub mod medal;
pub mod overrides;
pub mod raffle;
pub mod schedule;
pub mod spin_event;
pub mod streak;

pub use collector::CollectorQuery;
pub use medal::{Medal, MedalStats, MedalTier, RawMedal};
pub use overrides::OverrideTable;
pub use raffle::{RaffleSnapshot, RaffleStatus};
pub use schedule::{SPIN_COOLDOWN_SECS, ScheduleState, SpinPhase};
pub use spin_event::{SpinEvent, UnixSeconds};
pub use streak::{StreakPolicy, StreakState};
