//! Spin events as recorded by the MedalSpin contract.

use alloy::primitives::{B256, U256};

/// Seconds since the UNIX epoch.
///
/// Signed so that a corrupt source value can be represented and then
/// rejected by [`SpinEvent::is_well_formed`].
pub type UnixSeconds = i64;

/// One recorded spin: an opaque hash and the second it happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpinEvent {
    /// Opaque spin hash. Ignored by every calculation.
    pub hash: B256,
    /// UNIX seconds of the spin.
    pub timestamp: UnixSeconds,
}

impl SpinEvent {
    /// Creates a spin event.
    #[must_use]
    pub const fn new(hash: B256, timestamp: UnixSeconds) -> Self {
        Self { hash, timestamp }
    }

    /// Converts a raw on-chain `(hash, uint256 timestamp)` pair.
    ///
    /// Returns `None` when the timestamp does not fit a non-negative
    /// [`UnixSeconds`].
    #[must_use]
    pub fn from_raw(hash: B256, timestamp: U256) -> Option<Self> {
        let secs = i64::try_from(timestamp).ok()?;
        let event = Self::new(hash, secs);
        event.is_well_formed().then_some(event)
    }

    /// `false` for events the calculators must skip.
    #[must_use]
    pub const fn is_well_formed(&self) -> bool {
        self.timestamp >= 0
    }
}

/// Iterates the timestamps of the well-formed events in `events`.
pub fn valid_timestamps(events: &[SpinEvent]) -> impl Iterator<Item = UnixSeconds> + '_ {
    events
        .iter()
        .filter(|e| e.is_well_formed())
        .map(|e| e.timestamp)
}

/// Most recent well-formed timestamp, independent of input order.
#[must_use]
pub fn last_spin(events: &[SpinEvent]) -> Option<UnixSeconds> {
    valid_timestamps(events).max()
}

/// Number of well-formed events.
#[must_use]
pub fn spin_count(events: &[SpinEvent]) -> usize {
    valid_timestamps(events).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_raw_rejects_out_of_range() {
        assert!(SpinEvent::from_raw(B256::ZERO, U256::from(1_757_000_000_u64)).is_some());
        assert!(SpinEvent::from_raw(B256::ZERO, U256::MAX).is_none());
    }

    #[test]
    fn last_spin_ignores_order_and_malformed() {
        let events = [
            SpinEvent::new(B256::ZERO, 300),
            SpinEvent::new(B256::ZERO, 900),
            SpinEvent::new(B256::ZERO, -5),
            SpinEvent::new(B256::ZERO, 600),
        ];
        assert_eq!(last_spin(&events), Some(900));
        assert_eq!(spin_count(&events), 3);
        assert_eq!(last_spin(&[]), None);
    }
}
