//! Medals minted by Medal Spin onto a collector's Stack.
//!
//! Medal records arrive from the Stack NFT contract with a tier code and an
//! opaque metadata blob. Only medals whose metadata names the `MEDAL-SPIN`
//! project belong to this tracker.

use std::collections::BTreeSet;

use alloy::primitives::{Bytes, U256};
use alloy::sol_types::SolValue;
use serde::{Deserialize, Serialize};

use super::spin_event::{SpinEvent, UnixSeconds};

/// Project id carried in Medal Spin metadata.
pub const MEDAL_SPIN_PROJECT: &str = "MEDAL-SPIN";

/// Largest distance between a Black medal and the spin record it replaces.
pub const RAFFLE_CLAIM_WINDOW_SECS: i64 = 24 * 60 * 60;

/// Medal tier as encoded on chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MedalTier {
    /// Tier 1.
    Bronze,
    /// Tier 2.
    Silver,
    /// Tier 3.
    Gold,
    /// Tier 4, awarded by the raffle rather than a spin.
    Black,
}

impl MedalTier {
    /// Maps the on-chain tier code.
    #[must_use]
    pub const fn from_code(code: u16) -> Option<Self> {
        match code {
            1 => Some(Self::Bronze),
            2 => Some(Self::Silver),
            3 => Some(Self::Gold),
            4 => Some(Self::Black),
            _ => None,
        }
    }

    /// Infers the tier from a metadata id such as `medal-spin-gold`.
    #[must_use]
    pub fn from_metadata_id(id: &str) -> Option<Self> {
        let id = id.to_ascii_lowercase();
        [
            ("bronze", Self::Bronze),
            ("silver", Self::Silver),
            ("gold", Self::Gold),
            ("black", Self::Black),
        ]
        .into_iter()
        .find_map(|(needle, tier)| id.contains(needle).then_some(tier))
    }

    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bronze => "Bronze",
            Self::Silver => "Silver",
            Self::Gold => "Gold",
            Self::Black => "Black/Obsidian",
        }
    }

    /// `true` for tiers a spin can award.
    #[must_use]
    pub const fn is_spin_reward(self) -> bool {
        !matches!(self, Self::Black)
    }
}

/// JSON metadata attached to a medal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedalMetadata {
    /// Issuing project, `MEDAL-SPIN` for ours.
    #[serde(default)]
    pub project_id: Option<String>,
    /// Human-readable medal name.
    #[serde(default)]
    pub name: Option<String>,
    /// Medal id, e.g. `medal-spin-bronze`.
    #[serde(default)]
    pub id: Option<String>,
}

impl MedalMetadata {
    /// Decodes metadata stored either as raw UTF-8 JSON or as an
    /// ABI-encoded `string` holding JSON.
    #[must_use]
    pub fn decode(data: &[u8]) -> Option<Self> {
        if let Some(meta) = std::str::from_utf8(data)
            .ok()
            .and_then(|s| serde_json::from_str(s.trim_end_matches('\0')).ok())
        {
            return Some(meta);
        }
        let text = String::abi_decode(data).ok()?;
        serde_json::from_str(&text).ok()
    }

    /// `true` when the medal was issued by Medal Spin.
    #[must_use]
    pub fn is_medal_spin(&self) -> bool {
        self.project_id.as_deref() == Some(MEDAL_SPIN_PROJECT)
    }

    /// Name to display, falling back to the id.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .or_else(|| self.id.clone())
            .unwrap_or_else(|| "Medal".to_string())
    }
}

/// A medal record exactly as the Stack contract returns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMedal {
    /// Tier code.
    pub tier: u16,
    /// Opaque metadata blob.
    pub data: Bytes,
    /// Mint time in UNIX seconds.
    pub timestamp: U256,
}

/// A decoded Medal Spin medal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Medal {
    /// Medal tier.
    pub tier: MedalTier,
    /// Display name.
    pub name: String,
    /// Mint time in UNIX seconds.
    pub timestamp: UnixSeconds,
}

impl Medal {
    /// Decodes a raw record, keeping only valid Medal Spin medals.
    #[must_use]
    pub fn from_raw(raw: &RawMedal) -> Option<Self> {
        let tier = MedalTier::from_code(raw.tier)?;
        let meta = MedalMetadata::decode(&raw.data)?;
        if !meta.is_medal_spin() {
            return None;
        }
        Some(Self {
            tier,
            name: meta.display_name(),
            timestamp: i64::try_from(raw.timestamp).ok()?,
        })
    }
}

/// Decodes every Medal Spin medal in `raw`, sorted by mint time.
#[must_use]
pub fn decode_medals(raw: &[RawMedal]) -> Vec<Medal> {
    let mut medals: Vec<Medal> = raw.iter().filter_map(Medal::from_raw).collect();
    medals.sort_by_key(|m| m.timestamp);
    medals
}

/// Per-tier medal totals for spin rewards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedalStats {
    /// Spin-awarded medals.
    pub total: u64,
    /// Bronze medals.
    pub bronze: u64,
    /// Silver medals.
    pub silver: u64,
    /// Gold medals.
    pub gold: u64,
    /// Black medals. Always zero here; they come from the raffle.
    pub black: u64,
}

impl MedalStats {
    /// Tallies spin-reward medals, leaving Black medals out.
    #[must_use]
    pub fn from_medals(medals: &[Medal]) -> Self {
        medals
            .iter()
            .filter(|m| m.tier.is_spin_reward())
            .fold(Self::default(), |mut stats, medal| {
                stats.total += 1;
                match medal.tier {
                    MedalTier::Bronze => stats.bronze += 1,
                    MedalTier::Silver => stats.silver += 1,
                    MedalTier::Gold => stats.gold += 1,
                    MedalTier::Black => {}
                }
                stats
            })
    }
}

/// Drops spin records that are really Black medal claims.
///
/// Claiming a raffle prize goes through the spin contract and leaves a spin
/// record. For each Black medal the spin closest in time (within
/// [`RAFFLE_CLAIM_WINDOW_SECS`]) is removed.
#[must_use]
pub fn strip_raffle_claims(spins: &[SpinEvent], medals: &[Medal]) -> Vec<SpinEvent> {
    let claimed: BTreeSet<usize> = medals
        .iter()
        .filter(|m| m.tier == MedalTier::Black)
        .filter_map(|black| {
            spins
                .iter()
                .enumerate()
                .map(|(idx, spin)| (idx, (spin.timestamp - black.timestamp).abs()))
                .filter(|(_, diff)| *diff <= RAFFLE_CLAIM_WINDOW_SECS)
                .min_by_key(|(_, diff)| *diff)
                .map(|(idx, _)| idx)
        })
        .collect();

    spins
        .iter()
        .enumerate()
        .filter(|(idx, _)| !claimed.contains(idx))
        .map(|(_, spin)| *spin)
        .collect()
}
