//! Host-ledger block numbers.
//!
//! Every deadline in the rollup and the challenge game is measured in host
//! blocks. Engines never read a clock themselves; callers pass `now`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A host-ledger block height.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockNumber(u64);

impl BlockNumber {
    pub const GENESIS: Self = Self(0);

    pub fn new(height: u64) -> Self {
        Self(height)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// This height plus `blocks`, saturating at `u64::MAX`.
    pub fn saturating_add(&self, blocks: u64) -> Self {
        Self(self.0.saturating_add(blocks))
    }

    /// Blocks elapsed since this height (relative to `now`), zero if `now` is earlier.
    pub fn elapsed_since(&self, now: BlockNumber) -> u64 {
        now.0.saturating_sub(self.0)
    }

    /// Whether `now` is at or past this height.
    pub fn is_reached_at(&self, now: BlockNumber) -> bool {
        now.0 >= self.0
    }

    /// Whether `now` is strictly later than this height.
    pub fn is_passed_at(&self, now: BlockNumber) -> bool {
        now.0 > self.0
    }
}

/// Source of the current host block height.
pub trait BlockClock: Send + Sync {
    fn now(&self) -> BlockNumber;
}

impl fmt::Display for BlockNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
