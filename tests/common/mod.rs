//! Shared fixtures for router tests: a scripted chain and an app builder.

#![allow(dead_code, clippy::panic)]

use std::collections::HashMap;
use std::sync::Arc;

use alloy::primitives::{Address, B256, Bytes, U256, address};
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use futures_util::future::BoxFuture;
use tokio::sync::RwLock;
use tower::ServiceExt;

use spin_shape::api;
use spin_shape::app_state::AppState;
use spin_shape::chain::{ChainReader, CollectorSnapshot};
use spin_shape::config::ServiceConfig;
use spin_shape::domain::medal::RawMedal;
use spin_shape::domain::raffle::{RaffleSnapshot, RaffleWinner};
use spin_shape::domain::spin_event::SpinEvent;
use spin_shape::error::ServiceError;
use spin_shape::persistence::MemoryPersistence;

pub const HOME: Address = address!("0x2222222222222222222222222222222222222222");
pub const CRON_SECRET: &str = "cron-token";

/// Chain double with per-address spin lists.
#[derive(Debug, Default)]
pub struct ScriptedChain {
    pub spins: RwLock<HashMap<Address, Vec<SpinEvent>>>,
}

impl ScriptedChain {
    pub async fn set_spins(&self, who: Address, stamps: &[i64]) {
        let events = stamps
            .iter()
            .map(|ts| SpinEvent::new(B256::repeat_byte(0x01), *ts))
            .collect();
        self.spins.write().await.insert(who, events);
    }

    async fn list(&self, who: Address) -> Vec<SpinEvent> {
        self.spins.read().await.get(&who).cloned().unwrap_or_default()
    }
}

impl ChainReader for ScriptedChain {
    fn spins(&self, collector: Address) -> BoxFuture<'_, Result<Vec<SpinEvent>, ServiceError>> {
        Box::pin(async move { Ok(self.list(collector).await) })
    }

    fn collector_snapshot(
        &self,
        collector: Address,
        include_spins: bool,
    ) -> BoxFuture<'_, Result<CollectorSnapshot, ServiceError>> {
        Box::pin(async move {
            let spins = if include_spins {
                Some(self.list(collector).await)
            } else {
                None
            };
            Ok(CollectorSnapshot {
                spins,
                contract_can_spin: true,
                stack_id: None,
                raffle: RaffleSnapshot {
                    is_participant: false,
                    participant_count: 3,
                    current_round: 1,
                    minimum_streak: 7,
                    is_frozen: false,
                },
            })
        })
    }

    fn stack_medals(&self, _stack_id: U256) -> BoxFuture<'_, Result<Vec<RawMedal>, ServiceError>> {
        Box::pin(async { Ok(Vec::new()) })
    }

    fn raffle_winners(&self, _rounds: Vec<u64>) -> BoxFuture<'_, Result<Vec<RaffleWinner>, ServiceError>> {
        Box::pin(async { Ok(Vec::new()) })
    }

    fn block_number(&self) -> BoxFuture<'_, Result<u64, ServiceError>> {
        Box::pin(async { Ok(0) })
    }

    fn medal_logs(&self, _from: u64, _to: u64) -> BoxFuture<'_, Result<Vec<Bytes>, ServiceError>> {
        Box::pin(async { Ok(Vec::new()) })
    }

    fn lookup_ens(&self, _address: Address) -> BoxFuture<'_, Result<Option<String>, ServiceError>> {
        Box::pin(async { Ok(None) })
    }

    fn resolve_ens(&self, _name: String) -> BoxFuture<'_, Result<Option<Address>, ServiceError>> {
        Box::pin(async { Ok(None) })
    }
}

/// Builds the router over `chain` with a home collector, a cron secret and
/// a tight wallet rate limit.
pub fn app(chain: &Arc<ScriptedChain>) -> Router {
    let home = HOME.to_string();
    let env: HashMap<&str, &str> = HashMap::from([
        ("PUBLIC_ADDRESS", home.as_str()),
        ("CRON_SECRET", CRON_SECRET),
        ("RATE_LIMIT_MAX_REQUESTS", "2"),
        ("SHAPE_RPC_URLS", "http://127.0.0.1:1"),
    ]);
    let Ok(config) = ServiceConfig::from_lookup(|k| env.get(k).map(|v| (*v).to_string())) else {
        panic!("test configuration");
    };
    let state = AppState::new(
        &config,
        Arc::clone(chain) as Arc<dyn ChainReader>,
        Arc::new(MemoryPersistence::new()),
        None,
    );
    api::build_router().with_state(state)
}

/// Sends `request` and returns the status and JSON body.
pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let Ok(response) = app.oneshot(request).await else {
        panic!("router is infallible");
    };
    let status = response.status();
    let Ok(bytes) = axum::body::to_bytes(response.into_body(), usize::MAX).await else {
        panic!("body");
    };
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

pub fn get(uri: &str) -> Request<Body> {
    let Ok(request) = Request::builder().uri(uri).body(Body::empty()) else {
        panic!("request");
    };
    request
}
