//! Chain access for the Shape network and ENS.
//!
//! [`ChainReader`] is the seam between the services and the blockchain.
//! [`RpcChainReader`] implements it with alloy providers, Multicall3
//! batching and endpoint failover. Tests substitute an in-memory fake.

#[allow(missing_docs)]
pub mod contracts;
pub mod ens;
pub mod rpc;

use std::fmt;

use alloy::primitives::{Address, B256, Bytes, U256, address, b256};
use futures_util::future::BoxFuture;

use crate::domain::medal::RawMedal;
use crate::domain::raffle::{RaffleSnapshot, RaffleWinner};
use crate::domain::spin_event::SpinEvent;
use crate::error::ServiceError;

pub use rpc::{RpcChainReader, RpcPool, RpcSettings};

/// Default Medal Spin contract.
pub const MEDAL_SPIN_ADDRESS: Address = address!("0x99BB9Dca4F8Ed3FB04eCBE2bA9f5f378301DBaC1");

/// Default Stack NFT contract.
pub const STACK_NFT_ADDRESS: Address = address!("0x76d6aC90A62Ca547d51D7AcAeD014167F81B9931");

/// Default Black Medal raffle contract.
pub const RAFFLE_ADDRESS: Address = address!("0xEFe03c16c2f08B622D0d9A01cC8169da33CfeEDe");

/// ENS registry on Ethereum mainnet.
pub const ENS_REGISTRY_ADDRESS: Address = address!("0x00000000000C2E074eC69A0dFb2997BA6C7d2e1e");

/// Topic of the Stack NFT event emitted when a medal is awarded.
pub const MEDAL_AWARDED_TOPIC: B256 =
    b256!("0x5c24d76f2bf28abc7d31e1a28c9bba49bbd57578d2d3b1c670d32b5562baf61d");

/// Contract addresses used by the reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractAddresses {
    /// Medal Spin contract.
    pub medal_spin: Address,
    /// Stack NFT contract.
    pub stack_nft: Address,
    /// Black Medal raffle contract.
    pub raffle: Address,
}

impl Default for ContractAddresses {
    fn default() -> Self {
        Self {
            medal_spin: MEDAL_SPIN_ADDRESS,
            stack_nft: STACK_NFT_ADDRESS,
            raffle: RAFFLE_ADDRESS,
        }
    }
}

/// Everything the status page needs about one collector, read in a
/// single batch.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectorSnapshot {
    /// Spin records, when requested.
    pub spins: Option<Vec<SpinEvent>>,
    /// The contract's own `canSpin` answer.
    pub contract_can_spin: bool,
    /// Stack NFT id; `None` when the collector has no Stack.
    pub stack_id: Option<U256>,
    /// Raffle state for the collector.
    pub raffle: RaffleSnapshot,
}

/// Read-only access to the contracts and ENS.
///
/// Methods return boxed futures so readers can sit behind `Arc<dyn _>`.
pub trait ChainReader: Send + Sync + fmt::Debug {
    /// Spin records for `collector`, malformed records dropped.
    fn spins(&self, collector: Address) -> BoxFuture<'_, Result<Vec<SpinEvent>, ServiceError>>;

    /// Batched collector state; spins are fetched only if `include_spins`.
    fn collector_snapshot(
        &self,
        collector: Address,
        include_spins: bool,
    ) -> BoxFuture<'_, Result<CollectorSnapshot, ServiceError>>;

    /// Raw medal records held by a Stack.
    fn stack_medals(&self, stack_id: U256) -> BoxFuture<'_, Result<Vec<RawMedal>, ServiceError>>;

    /// Winners of the given rounds; rounds without a winner are omitted.
    fn raffle_winners(&self, rounds: Vec<u64>) -> BoxFuture<'_, Result<Vec<RaffleWinner>, ServiceError>>;

    /// Latest Shape block.
    fn block_number(&self) -> BoxFuture<'_, Result<u64, ServiceError>>;

    /// Data of every medal-awarded log in `[from, to]`.
    fn medal_logs(&self, from: u64, to: u64) -> BoxFuture<'_, Result<Vec<Bytes>, ServiceError>>;

    /// Verified primary ENS name of `address`.
    fn lookup_ens(&self, address: Address) -> BoxFuture<'_, Result<Option<String>, ServiceError>>;

    /// Address an ENS name points to.
    fn resolve_ens(&self, name: String) -> BoxFuture<'_, Result<Option<Address>, ServiceError>>;
}
