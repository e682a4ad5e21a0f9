//! Data Transfer Objects for REST responses.
//!
//! Service results are rendered here: addresses checksummed, timestamps in
//! seconds, milliseconds and display-timezone text.

pub mod common_dto;
pub mod cron_dto;
pub mod medal_dto;
pub mod raffle_dto;
pub mod schedule_dto;
pub mod status_dto;

pub use common_dto::*;
pub use cron_dto::*;
pub use medal_dto::*;
pub use raffle_dto::*;
pub use schedule_dto::*;
pub use status_dto::*;
