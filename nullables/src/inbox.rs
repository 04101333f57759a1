//! Nullable inbox: an in-memory message accumulator.

use std::sync::Mutex;

use vigil_rollup::Inbox;
use vigil_types::Bytes32;

/// An inbox whose messages are pushed by the test.
///
/// Accumulator `i` is `blake2b(accumulator(i - 1) || message_i)`, starting
/// from zero.
#[derive(Debug, Default)]
pub struct NullInbox {
    accumulators: Mutex<Vec<Bytes32>>,
}

impl NullInbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// An inbox already holding `count` messages.
    pub fn with_messages(count: u64) -> Self {
        let inbox = Self::new();
        for i in 0..count {
            inbox.push(&i.to_be_bytes());
        }
        inbox
    }

    /// Deliver a message and return its index.
    pub fn push(&self, message: &[u8]) -> u64 {
        let mut accumulators = self.accumulators.lock().unwrap();
        let prev = accumulators.last().copied().unwrap_or(Bytes32::ZERO);
        accumulators.push(vigil_crypto::hash_parts(&[&prev.as_bytes()[..], message]));
        accumulators.len() as u64 - 1
    }
}

impl Inbox for NullInbox {
    fn max_count(&self) -> u64 {
        self.accumulators.lock().unwrap().len() as u64
    }

    fn accumulator(&self, index: u64) -> Option<Bytes32> {
        let accumulators = self.accumulators.lock().unwrap();
        usize::try_from(index)
            .ok()
            .and_then(|i| accumulators.get(i).copied())
    }
}
