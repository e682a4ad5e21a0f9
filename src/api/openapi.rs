//! OpenAPI document for the REST surface.

use utoipa::OpenApi;

use super::dto::{
    ActivityDto, CollectorStatusResponse, CronConfigResponse, DrawDto, GapDto,
    GlobalMedalStatsResponse, MedalCountsDto, MedalDto, MedalStatsDto, MilestoneDto,
    NotificationDto, NotifyReportResponse, RaffleResponse, RaffleStatusDto, RecommendationDto,
    ScanReportResponse, ScheduleDto, ScheduleResponse, StreakDto, TestNotificationResponse,
    TimeDto, UpdatesResponse, WinnerDto,
};
use super::handlers::{cron, medals, raffle, schedule, status, system};
use crate::error::{ErrorBody, ErrorResponse};
use crate::notify::Delivery;

/// Generated API description, served at `/api-docs/openapi.json`.
#[derive(Debug, OpenApi)]
#[openapi(
    info(title = "spin-shape", description = "Medal Spin schedule, streak and medal tracker"),
    paths(
        system::health_handler,
        system::cron_config_handler,
        status::home_status,
        status::wallet_status,
        schedule::schedule,
        schedule::check_updates,
        raffle::raffle,
        medals::global_medals,
        cron::check_and_notify,
        cron::update_global_medals,
        cron::test_notification,
    ),
    components(schemas(
        ErrorResponse,
        ErrorBody,
        system::HealthResponse,
        TimeDto,
        ScheduleDto,
        StreakDto,
        MedalDto,
        MedalStatsDto,
        GapDto,
        ActivityDto,
        NotificationDto,
        CollectorStatusResponse,
        ScheduleResponse,
        UpdatesResponse,
        RaffleStatusDto,
        MilestoneDto,
        RecommendationDto,
        WinnerDto,
        DrawDto,
        RaffleResponse,
        MedalCountsDto,
        GlobalMedalStatsResponse,
        ScanReportResponse,
        CronConfigResponse,
        NotifyReportResponse,
        TestNotificationResponse,
        Delivery,
    )),
    tags(
        (name = "System", description = "Health and configuration"),
        (name = "Status", description = "Collector status"),
        (name = "Schedule", description = "Spin schedule and change checks"),
        (name = "Raffle", description = "Black Medal raffle"),
        (name = "Medals", description = "Network-wide medal counters"),
        (name = "Cron", description = "Scheduled jobs"),
    )
)]
pub struct ApiDoc;
