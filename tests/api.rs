//! End-to-end tests of the HTTP surface over a scripted chain.

#![allow(clippy::panic, clippy::indexing_slicing)]

mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::Utc;

use common::{CRON_SECRET, HOME, ScriptedChain, app, get, send};

const HOUR: i64 = 3_600;

#[tokio::test]
async fn health_and_cron_config() {
    let chain = Arc::new(ScriptedChain::default());
    let (status, body) = send(app(&chain), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(app(&chain), get("/config/cron")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cron_schedule"], "*/10 * * * *");
    assert_eq!(body["interval_minutes"], 10);
}

#[tokio::test]
async fn home_status_reports_cooldown() {
    let chain = Arc::new(ScriptedChain::default());
    let now = Utc::now().timestamp();
    chain.set_spins(HOME, &[now - 30 * HOUR, now - 2 * HOUR]).await;

    let (status, body) = send(app(&chain), get("/api/v1/status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["address"], HOME.to_string());
    assert_eq!(body["schedule"]["spin_count"], 2);
    assert_eq!(body["schedule"]["can_spin_now"], false);
    assert_eq!(body["schedule"]["phase"], "COOLING_DOWN");
    assert_eq!(body["streak"]["current_streak_days"], 2);
    assert_eq!(body["streak"]["at_risk"], false);
    assert_eq!(body["display_name"], "0x2222...2222");
    assert_eq!(body["suggested_poll_interval_secs"], 300);
    assert!(body["notification"]["slot"].is_object());
    assert_eq!(body["history"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn schedule_and_updates() {
    let chain = Arc::new(ScriptedChain::default());
    let now = Utc::now().timestamp();
    chain.set_spins(HOME, &[now - 26 * HOUR]).await;

    let (status, body) = send(app(&chain), get("/api/v1/schedule")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["schedule"]["can_spin_now"], true);
    assert_eq!(body["schedule"]["seconds_until_eligible"], 0);
    assert!(body["notification_slot"].is_null());

    let (status, body) = send(app(&chain), get("/api/v1/updates?known_spin_count=0")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["has_updates"], true);
    assert_eq!(body["suggested_poll_interval_secs"], 30);
}

#[tokio::test]
async fn wallet_lookup_validates_and_limits() {
    let chain = Arc::new(ScriptedChain::default());
    let router = app(&chain);

    let (status, body) = send(router.clone(), get("/api/v1/wallets/not-a-wallet")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], 1002);

    let (status, _) = send(router.clone(), get("/api/v1/wallets/nobody.eth")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let wallet = "/api/v1/wallets/0x3333333333333333333333333333333333333333";
    let (first, body) = send(router.clone(), get(wallet)).await;
    assert_eq!(first, StatusCode::OK);
    assert_eq!(body["schedule"]["phase"], "NO_HISTORY");
    let (second, _) = send(router.clone(), get(wallet)).await;
    assert_eq!(second, StatusCode::OK);
    let (third, body) = send(router, get(wallet)).await;
    assert_eq!(third, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"]["code"], 429);
}

#[tokio::test]
async fn cron_requires_bearer_token() {
    let chain = Arc::new(ScriptedChain::default());
    let router = app(&chain);

    let Ok(unauthenticated) = Request::post("/api/v1/cron/check-and-notify").body(Body::empty()) else {
        panic!("request");
    };
    let (status, _) = send(router.clone(), unauthenticated).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let Ok(authenticated) = Request::post("/api/v1/cron/check-and-notify")
        .header(header::AUTHORIZATION, format!("Bearer {CRON_SECRET}"))
        .body(Body::empty())
    else {
        panic!("request");
    };
    let (status, body) = send(router.clone(), authenticated).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["can_spin_now"], true);
    assert_eq!(body["notifications_enabled"], false);
    assert_eq!(body["notification_sent"], false);

    let Ok(test_text) = Request::post("/api/v1/cron/test-notification")
        .header(header::AUTHORIZATION, format!("Bearer {CRON_SECRET}"))
        .body(Body::empty())
    else {
        panic!("request");
    };
    let (status, body) = send(router, test_text).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], 3002);
}

#[tokio::test]
async fn raffle_and_global_medals() {
    let chain = Arc::new(ScriptedChain::default());
    let now = Utc::now().timestamp();
    chain.set_spins(HOME, &[now - HOUR]).await;

    let (status, body) = send(app(&chain), get("/api/v1/raffle")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"]["is_eligible"], false);
    assert_eq!(body["status"]["days_to_eligibility"], 6);
    assert_eq!(body["recommendation"]["action"], "keep_spinning");
    assert_eq!(body["draw"]["is_scheduled"], false);

    let (status, body) = send(app(&chain), get("/api/v1/medals/global")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["counts"]["total"], 0);
    assert_eq!(body["source"], "empty");
    assert_eq!(body["stale"], true);
}
