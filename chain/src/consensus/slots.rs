//! Slot arithmetic.
//!
//! Wall-clock time is divided into fixed-length slots counted from the
//! chain epoch; each slot belongs to exactly one delegate. Block
//! timestamps are stored as seconds since the epoch, so converting a
//! block timestamp to its slot is a plain integer division.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::consensus::config::ConsensusConfig;

/// Pure slot/time conversions for a fixed epoch and interval.
#[derive(Clone, Copy, Debug)]
pub struct Slots {
    epoch_unix_secs: u64,
    interval_secs: u64,
}

impl Slots {
    /// Creates a slot calculator. A zero interval is clamped to one
    /// second to keep the divisions well-defined.
    pub fn new(epoch_unix_secs: u64, interval_secs: u64) -> Self {
        Self {
            epoch_unix_secs,
            interval_secs: interval_secs.max(1),
        }
    }

    pub fn from_config(cfg: &ConsensusConfig) -> Self {
        Self::new(cfg.epoch_unix_secs, cfg.slot_interval_secs)
    }

    /// Converts a Unix timestamp to seconds since the chain epoch.
    ///
    /// Times before the epoch saturate to zero.
    pub fn epoch_seconds(&self, unix_secs: u64) -> u64 {
        unix_secs.saturating_sub(self.epoch_unix_secs)
    }

    /// Slot number of an epoch-relative timestamp.
    pub fn slot_of(&self, timestamp: u64) -> u64 {
        timestamp / self.interval_secs
    }

    /// Epoch-relative timestamp at which `slot` begins.
    pub fn slot_start(&self, slot: u64) -> u64 {
        slot * self.interval_secs
    }

    /// Slot number of the current wall-clock time.
    pub fn current_slot(&self) -> u64 {
        self.slot_of(self.epoch_seconds(unix_now()))
    }

    /// Current wall-clock time as seconds since the chain epoch.
    pub fn epoch_now(&self) -> u64 {
        self.epoch_seconds(unix_now())
    }
}

/// Returns the current wall-clock time as seconds since Unix epoch.
///
/// On error (system clock before epoch) this falls back to 0.
fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_of_floors_to_interval_boundaries() {
        let slots = Slots::new(0, 10);

        assert_eq!(slots.slot_of(0), 0);
        assert_eq!(slots.slot_of(9), 0);
        assert_eq!(slots.slot_of(10), 1);
        assert_eq!(slots.slot_of(19), 1);
        assert_eq!(slots.slot_of(25), 2);
    }

    #[test]
    fn epoch_seconds_saturates_before_epoch() {
        let slots = Slots::new(1_600_000_000, 10);

        assert_eq!(slots.epoch_seconds(1_599_999_999), 0);
        assert_eq!(slots.epoch_seconds(1_600_000_000), 0);
        assert_eq!(slots.epoch_seconds(1_600_000_042), 42);
    }

    #[test]
    fn slot_start_inverts_slot_of_on_boundaries() {
        let slots = Slots::new(0, 10);

        for slot in [0u64, 1, 7, 1_000] {
            assert_eq!(slots.slot_of(slots.slot_start(slot)), slot);
        }
    }

    #[test]
    fn zero_interval_is_clamped() {
        let slots = Slots::new(0, 0);
        // Would divide by zero without the clamp.
        assert_eq!(slots.slot_of(5), 5);
    }

    #[test]
    fn current_slot_tracks_wall_clock() {
        // Anchor the epoch far enough in the past that the current slot
        // is large and stable against the test's own runtime.
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock after 1970")
            .as_secs();
        let slots = Slots::new(now - 1_000, 10);

        let current = slots.current_slot();
        assert!((100..=101).contains(&current), "current slot {current}");
    }
}
