//! Per-collector data corrections loaded from configuration.
//!
//! Some collectors carry on-chain records that are not real spins (a spin
//! submitted by a contract, a raffle win that predates the medal index).
//! Corrections live in a table keyed by address instead of control flow.

use std::collections::HashMap;

use alloy::primitives::Address;
use serde::Deserialize;

use super::spin_event::{SpinEvent, UnixSeconds};

fn default_label() -> String {
    "Contract Spin".to_string()
}

#[derive(Debug, Deserialize)]
struct RawOverride {
    address: String,
    #[serde(default)]
    excluded_spins: Vec<UnixSeconds>,
    #[serde(default = "default_label")]
    excluded_label: String,
    #[serde(default)]
    extra_raffle_wins: Vec<UnixSeconds>,
}

/// Corrections for one collector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorOverride {
    /// Spin timestamps that must not count as spins.
    pub excluded_spins: Vec<UnixSeconds>,
    /// Label shown in history for excluded spins.
    pub excluded_label: String,
    /// Raffle wins to add to the activity history.
    pub extra_raffle_wins: Vec<UnixSeconds>,
}

/// Error raised while loading the override table.
#[derive(Debug, thiserror::Error)]
pub enum OverrideError {
    /// The table is not valid JSON of the expected shape.
    #[error("malformed override table: {0}")]
    Json(#[from] serde_json::Error),
    /// An entry carries an unparseable address.
    #[error("bad override address {0}")]
    Address(String),
}

/// Address-keyed correction table.
#[derive(Debug, Clone, Default)]
pub struct OverrideTable {
    entries: HashMap<Address, CollectorOverride>,
}

impl OverrideTable {
    /// Parses a JSON array of overrides.
    ///
    /// An empty string yields an empty table. Entries for the same address
    /// are merged.
    ///
    /// # Errors
    ///
    /// Returns [`OverrideError`] on malformed JSON or a bad address.
    pub fn from_json(json: &str) -> Result<Self, OverrideError> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        let raw: Vec<RawOverride> = serde_json::from_str(json)?;
        let mut entries: HashMap<Address, CollectorOverride> = HashMap::new();
        for item in raw {
            let address: Address = item
                .address
                .trim()
                .parse()
                .map_err(|_| OverrideError::Address(item.address.clone()))?;
            let entry = entries.entry(address).or_insert_with(|| CollectorOverride {
                excluded_spins: Vec::new(),
                excluded_label: item.excluded_label.clone(),
                extra_raffle_wins: Vec::new(),
            });
            entry.excluded_spins.extend(item.excluded_spins);
            entry.extra_raffle_wins.extend(item.extra_raffle_wins);
        }
        Ok(Self { entries })
    }

    /// Number of collectors with corrections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when no corrections are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Corrections for `address`, if any.
    #[must_use]
    pub fn get(&self, address: &Address) -> Option<&CollectorOverride> {
        self.entries.get(address)
    }

    /// Label for a spin that must not count, or `None` for a real spin.
    #[must_use]
    pub fn excluded_label(&self, address: &Address, timestamp: UnixSeconds) -> Option<&str> {
        self.get(address)
            .filter(|o| o.excluded_spins.contains(&timestamp))
            .map(|o| o.excluded_label.as_str())
    }

    /// Spins of `address` that count toward schedule, streak and totals.
    #[must_use]
    pub fn counted_spins(&self, address: &Address, events: &[SpinEvent]) -> Vec<SpinEvent> {
        match self.get(address) {
            None => events.to_vec(),
            Some(o) => events
                .iter()
                .filter(|e| !o.excluded_spins.contains(&e.timestamp))
                .copied()
                .collect(),
        }
    }

    /// Extra raffle wins recorded for `address`.
    #[must_use]
    pub fn extra_raffle_wins(&self, address: &Address) -> &[UnixSeconds] {
        self.get(address)
            .map(|o| o.extra_raffle_wins.as_slice())
            .unwrap_or_default()
    }
}
