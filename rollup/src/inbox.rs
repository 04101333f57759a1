//! The inbox collaborator.

use vigil_types::Bytes32;

/// Read-only view of the message inbox that feeds the rollup.
pub trait Inbox {
    /// Number of messages delivered so far.
    fn max_count(&self) -> u64;

    /// Accumulator over messages `0..=index`, if that many exist.
    fn accumulator(&self, index: u64) -> Option<Bytes32>;
}

impl<T: Inbox + ?Sized> Inbox for &T {
    fn max_count(&self) -> u64 {
        (**self).max_count()
    }

    fn accumulator(&self, index: u64) -> Option<Bytes32> {
        (**self).accumulator(index)
    }
}
