//! Database models for wallet tracking and raffle winners.

use alloy::primitives::Address;
use chrono::{DateTime, Utc};

/// One wallet lookup recorded for analytics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletVisit {
    /// Looked-up collector.
    pub address: Address,
    /// Resolved ENS name, if any.
    pub ens_name: Option<String>,
    /// Caller IP address.
    pub ip_address: Option<String>,
    /// Caller user agent.
    pub user_agent: Option<String>,
    /// Caller referrer.
    pub referrer: Option<String>,
    /// Counted spins.
    pub spin_count: u64,
    /// Spin-awarded medals.
    pub medal_count: u64,
    /// Stack NFT id, decimal.
    pub stack_id: Option<String>,
    /// Eligibility at lookup time.
    pub can_spin_now: bool,
    /// Last counted spin.
    pub last_spin_timestamp: Option<i64>,
    /// Lookup time.
    pub visited_at: DateTime<Utc>,
}

/// A row of the `wallets` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletRecord {
    /// Lower-case hex address.
    pub wallet_address: String,
    /// Cached ENS name.
    pub ens_name: Option<String>,
    /// ENS cache expiry.
    pub ens_expires_at: Option<DateTime<Utc>>,
    /// Lookups so far.
    pub visit_count: i64,
    /// Most recent lookup.
    pub last_visit: Option<DateTime<Utc>>,
}

/// Storage key for an address: lower-case `0x` hex.
#[must_use]
pub fn address_key(address: &Address) -> String {
    address.to_string().to_ascii_lowercase()
}
