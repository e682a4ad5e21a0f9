//! In-memory chain and notifier doubles for service tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use alloy::primitives::{Address, B256, Bytes, U256, address};
use futures_util::future::BoxFuture;
use tokio::sync::RwLock;

use crate::chain::{ChainReader, CollectorSnapshot};
use crate::domain::medal::RawMedal;
use crate::domain::raffle::{RaffleSnapshot, RaffleWinner};
use crate::domain::spin_event::SpinEvent;
use crate::error::ServiceError;
use crate::notify::{Delivery, Notifier};

pub(crate) const HOME: Address = address!("0x1111111111111111111111111111111111111111");

pub(crate) fn spin(ts: i64) -> SpinEvent {
    SpinEvent::new(B256::repeat_byte(0xAB), ts)
}

pub(crate) fn medal_record(tier: u16, ts: i64) -> RawMedal {
    let json = format!(r#"{{"projectId":"MEDAL-SPIN","name":"Tier {tier}","id":"medal-spin-{tier}"}}"#);
    RawMedal {
        tier,
        data: Bytes::from(json.into_bytes()),
        timestamp: U256::from(ts.unsigned_abs()),
    }
}

pub(crate) fn raffle(round: u64) -> RaffleSnapshot {
    RaffleSnapshot {
        is_participant: false,
        participant_count: 4,
        current_round: round,
        minimum_streak: 7,
        is_frozen: false,
    }
}

#[derive(Debug, Default)]
pub(crate) struct FakeState {
    pub spins: HashMap<Address, Vec<SpinEvent>>,
    pub stack_ids: HashMap<Address, U256>,
    pub medals: HashMap<U256, Vec<RawMedal>>,
    pub raffle: Option<RaffleSnapshot>,
    pub winners: HashMap<u64, Address>,
    pub head: u64,
    pub logs: Vec<(u64, Bytes)>,
    pub ens: HashMap<Address, String>,
}

/// Scripted [`ChainReader`] counting its spin reads.
///
/// `fail_logs_from` makes log reads starting at or past that block fail;
/// zero disables it.
#[derive(Debug, Default)]
pub(crate) struct FakeChain {
    pub state: RwLock<FakeState>,
    pub spin_reads: AtomicUsize,
    pub fail_snapshot: AtomicBool,
    pub fail_logs_from: AtomicU64,
    pub head_reads: AtomicUsize,
}

impl FakeChain {
    pub(crate) async fn set_spins(&self, who: Address, spins: Vec<SpinEvent>) {
        self.state.write().await.spins.insert(who, spins);
    }

    fn spin_list(state: &FakeState, who: Address) -> Vec<SpinEvent> {
        state.spins.get(&who).cloned().unwrap_or_default()
    }
}

impl ChainReader for FakeChain {
    fn spins(&self, collector: Address) -> BoxFuture<'_, Result<Vec<SpinEvent>, ServiceError>> {
        Box::pin(async move {
            self.spin_reads.fetch_add(1, Ordering::SeqCst);
            Ok(Self::spin_list(&*self.state.read().await, collector))
        })
    }

    fn collector_snapshot(
        &self,
        collector: Address,
        include_spins: bool,
    ) -> BoxFuture<'_, Result<CollectorSnapshot, ServiceError>> {
        Box::pin(async move {
            if self.fail_snapshot.load(Ordering::SeqCst) {
                return Err(ServiceError::Chain("snapshot unavailable".into()));
            }
            let state = self.state.read().await;
            let spins = if include_spins {
                self.spin_reads.fetch_add(1, Ordering::SeqCst);
                Some(Self::spin_list(&state, collector))
            } else {
                None
            };
            Ok(CollectorSnapshot {
                spins,
                contract_can_spin: false,
                stack_id: state.stack_ids.get(&collector).copied(),
                raffle: state.raffle.unwrap_or_else(|| raffle(0)),
            })
        })
    }

    fn stack_medals(&self, stack_id: U256) -> BoxFuture<'_, Result<Vec<RawMedal>, ServiceError>> {
        Box::pin(async move {
            Ok(self
                .state
                .read()
                .await
                .medals
                .get(&stack_id)
                .cloned()
                .unwrap_or_default())
        })
    }

    fn raffle_winners(&self, rounds: Vec<u64>) -> BoxFuture<'_, Result<Vec<RaffleWinner>, ServiceError>> {
        Box::pin(async move {
            let state = self.state.read().await;
            Ok(rounds
                .into_iter()
                .filter_map(|round| {
                    state
                        .winners
                        .get(&round)
                        .map(|winner| RaffleWinner { round, winner: *winner })
                })
                .collect())
        })
    }

    fn block_number(&self) -> BoxFuture<'_, Result<u64, ServiceError>> {
        Box::pin(async move {
            self.head_reads.fetch_add(1, Ordering::SeqCst);
            Ok(self.state.read().await.head)
        })
    }

    fn medal_logs(&self, from: u64, to: u64) -> BoxFuture<'_, Result<Vec<Bytes>, ServiceError>> {
        Box::pin(async move {
            let fail_from = self.fail_logs_from.load(Ordering::SeqCst);
            if fail_from != 0 && from >= fail_from {
                return Err(ServiceError::Chain("getLogs: 429 too many requests".into()));
            }
            Ok(self
                .state
                .read()
                .await
                .logs
                .iter()
                .filter(|(block, _)| (from..=to).contains(block))
                .map(|(_, data)| data.clone())
                .collect())
        })
    }

    fn lookup_ens(&self, address: Address) -> BoxFuture<'_, Result<Option<String>, ServiceError>> {
        Box::pin(async move { Ok(self.state.read().await.ens.get(&address).cloned()) })
    }

    fn resolve_ens(&self, name: String) -> BoxFuture<'_, Result<Option<Address>, ServiceError>> {
        Box::pin(async move {
            Ok(self
                .state
                .read()
                .await
                .ens
                .iter()
                .find(|(_, n)| **n == name)
                .map(|(a, _)| *a))
        })
    }
}

/// [`Notifier`] that records texts and can be told to fail.
#[derive(Debug, Default)]
pub(crate) struct RecordingNotifier {
    pub sent: RwLock<Vec<String>>,
    pub fail: AtomicBool,
}

impl Notifier for RecordingNotifier {
    fn send(&self, text: String) -> BoxFuture<'_, Result<Delivery, ServiceError>> {
        Box::pin(async move {
            if self.fail.load(Ordering::SeqCst) {
                return Err(ServiceError::Notification("provider down".into()));
            }
            self.sent.write().await.push(text);
            Ok(Delivery {
                message_id: Some("fake".into()),
            })
        })
    }

    fn recipient(&self) -> &str {
        "+15551234567"
    }

    fn provider(&self) -> &'static str {
        "Recording"
    }
}
