//! Nullable clock: deterministic host block height for testing.

use std::sync::atomic::{AtomicU64, Ordering};

use vigil_types::{BlockClock, BlockNumber};

/// A deterministic block clock.
///
/// The height only moves when you tell it to.
#[derive(Debug, Default)]
pub struct NullClock {
    current: AtomicU64,
}

impl NullClock {
    pub fn new(height: u64) -> Self {
        Self {
            current: AtomicU64::new(height),
        }
    }

    /// Advance by `blocks`.
    pub fn advance(&self, blocks: u64) {
        self.current.fetch_add(blocks, Ordering::SeqCst);
    }

    pub fn set(&self, height: u64) {
        self.current.store(height, Ordering::SeqCst);
    }
}

impl BlockClock for NullClock {
    fn now(&self) -> BlockNumber {
        BlockNumber::new(self.current.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_moves_when_told() {
        let clock = NullClock::new(100);
        assert_eq!(clock.now(), BlockNumber::new(100));
        clock.advance(25);
        assert_eq!(clock.now(), BlockNumber::new(125));
        clock.set(7);
        assert_eq!(clock.now(), BlockNumber::new(7));
    }
}
