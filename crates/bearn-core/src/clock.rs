// crates/bearn-core/src/clock.rs
//
// Host time source: a monotonically increasing block height and the block
// timestamp. Height drives reward accrual; the timestamp drives the treasury
// release cooldown.

use serde::{Deserialize, Serialize};

/// Read-only view of the host's block clock.
pub trait TimeSource {
    /// Current block height. Never decreases; may skip values.
    fn height(&self) -> u64;

    /// Current block timestamp in seconds. Never decreases.
    fn timestamp(&self) -> u64;
}

/// A clock advanced explicitly by its owner.
///
/// The in-process host uses this to "mine" blocks; tests use it to jump to
/// specific heights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualClock {
    height: u64,
    timestamp: u64,
}

impl ManualClock {
    pub fn new(height: u64, timestamp: u64) -> Self {
        Self { height, timestamp }
    }

    /// Advance by `blocks` blocks, each `block_time_secs` seconds apart.
    pub fn mine(&mut self, blocks: u64, block_time_secs: u64) {
        self.height = self.height.saturating_add(blocks);
        self.timestamp = self
            .timestamp
            .saturating_add(blocks.saturating_mul(block_time_secs));
    }

    /// Advance wall-clock time without producing blocks.
    pub fn advance_time(&mut self, secs: u64) {
        self.timestamp = self.timestamp.saturating_add(secs);
    }
}

impl TimeSource for ManualClock {
    fn height(&self) -> u64 {
        self.height
    }

    fn timestamp(&self) -> u64 {
        self.timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mine_advances_height_and_time() {
        let mut clock = ManualClock::new(0, 1_600_000_000);
        clock.mine(10, 13);
        assert_eq!(clock.height(), 10);
        assert_eq!(clock.timestamp(), 1_600_000_130);
    }

    #[test]
    fn test_advance_time_keeps_height() {
        let mut clock = ManualClock::new(5, 0);
        clock.advance_time(72 * 3600);
        assert_eq!(clock.height(), 5);
        assert_eq!(clock.timestamp(), 259_200);
    }
}
