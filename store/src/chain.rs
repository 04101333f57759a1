//! Chain storage trait.

use vigil_rollup::{AssertionNode, ChainSnapshot, RollupEvent};
use vigil_types::AssertionId;

use crate::StoreError;

/// Everything one driver step changed.
///
/// Written with [`ChainStore::write_batch`]: either all of it lands or none
/// of it does, so the event log never runs ahead of or behind the snapshot.
#[derive(Clone, Copy, Debug)]
pub struct ChainWrite<'a> {
    pub events: &'a [RollupEvent],
    /// Records to insert or overwrite.
    pub assertions: &'a [AssertionNode],
    pub snapshot: &'a ChainSnapshot,
}

/// Persistence for one assertion chain.
///
/// Events are numbered from zero in append order; `events_since` returns
/// them in that order.
pub trait ChainStore {
    /// Replace the stored snapshot.
    fn put_snapshot(&self, snapshot: &ChainSnapshot) -> Result<(), StoreError>;

    /// The latest snapshot, or `None` before the first one is written.
    fn get_snapshot(&self) -> Result<Option<ChainSnapshot>, StoreError>;

    /// Append an event and return its sequence number.
    fn put_event(&self, event: &RollupEvent) -> Result<u64, StoreError>;

    /// Append several events, returning the sequence number of the first.
    fn put_events(&self, events: &[RollupEvent]) -> Result<u64, StoreError> {
        let first = self.event_count()?;
        for event in events {
            self.put_event(event)?;
        }
        Ok(first)
    }

    /// Up to `limit` events starting at sequence number `from`.
    fn events_since(&self, from: u64, limit: usize) -> Result<Vec<(u64, RollupEvent)>, StoreError>;

    fn event_count(&self) -> Result<u64, StoreError>;

    /// Insert or overwrite the record for `node`'s id.
    fn put_assertion(&self, node: &AssertionNode) -> Result<(), StoreError>;

    fn get_assertion(&self, id: &AssertionId) -> Result<AssertionNode, StoreError>;

    fn assertion_count(&self) -> Result<u64, StoreError>;

    /// Append the events, store the records and replace the snapshot as one
    /// unit. Returns the sequence number of the first event.
    fn write_batch(&self, batch: ChainWrite<'_>) -> Result<u64, StoreError>;
}
