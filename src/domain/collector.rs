//! Collector identity as typed by a user: a hex address or an ENS name.

use std::fmt;
use std::str::FromStr;

use alloy::primitives::Address;

use crate::error::ServiceError;

/// A collector reference before ENS resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CollectorQuery {
    /// A `0x`-prefixed, 40 hex digit address.
    Address(Address),
    /// A lower-cased `<label>.eth` name.
    Ens(String),
}

impl CollectorQuery {
    /// The address if no resolution is needed.
    #[must_use]
    pub const fn address(&self) -> Option<Address> {
        match self {
            Self::Address(addr) => Some(*addr),
            Self::Ens(_) => None,
        }
    }
}

impl FromStr for CollectorQuery {
    type Err = ServiceError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let input = raw.trim();
        if let Some(hex) = input.strip_prefix("0x").or_else(|| input.strip_prefix("0X")) {
            if hex.len() == 40 && hex.bytes().all(|b| b.is_ascii_hexdigit()) {
                return input
                    .parse::<Address>()
                    .map(Self::Address)
                    .map_err(|e| ServiceError::InvalidCollector(format!("{input}: {e}")));
            }
            return Err(ServiceError::InvalidCollector(input.to_string()));
        }

        let lowered = input.to_ascii_lowercase();
        match lowered.strip_suffix(".eth") {
            Some(label)
                if !label.is_empty()
                    && label
                        .bytes()
                        .all(|b| b.is_ascii_alphanumeric() || b == b'-') =>
            {
                Ok(Self::Ens(lowered))
            }
            _ => Err(ServiceError::InvalidCollector(input.to_string())),
        }
    }
}

impl fmt::Display for CollectorQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address(addr) => write!(f, "{addr}"),
            Self::Ens(name) => f.write_str(name),
        }
    }
}

/// Shortens an address for display: `0x1234...abcd`.
#[must_use]
pub fn short_address(address: &Address) -> String {
    let full = address.to_string();
    match (full.get(..6), full.get(full.len().saturating_sub(4)..)) {
        (Some(head), Some(tail)) => format!("{head}...{tail}"),
        _ => full,
    }
}
