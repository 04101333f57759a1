//! LMDB implementation of ChainStore.
//!
//! Events are keyed by their big-endian sequence number so that a range scan
//! returns them in append order.

use std::ops::Bound;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, RwTxn};

use vigil_rollup::{AssertionNode, ChainSnapshot, RollupEvent};
use vigil_store::{ChainStore, ChainWrite, StoreError};
use vigil_types::AssertionId;

use crate::LmdbError;

const LATEST_SNAPSHOT_KEY: &[u8] = b"latest";

pub struct LmdbChainStore {
    pub(crate) env: Arc<Env>,
    pub(crate) snapshots_db: Database<Bytes, Bytes>,
    pub(crate) events_db: Database<Bytes, Bytes>,
    pub(crate) assertions_db: Database<Bytes, Bytes>,
}

impl LmdbChainStore {
    fn append_event(&self, wtxn: &mut RwTxn, event: &RollupEvent) -> Result<u64, LmdbError> {
        let seq = self.events_db.len(wtxn)?;
        let value = bincode::serialize(event)?;
        self.events_db.put(wtxn, &seq.to_be_bytes(), &value)?;
        Ok(seq)
    }

    fn write_assertion(&self, wtxn: &mut RwTxn, node: &AssertionNode) -> Result<(), LmdbError> {
        let value = bincode::serialize(node)?;
        self.assertions_db.put(wtxn, node.id().as_bytes(), &value)?;
        Ok(())
    }

    fn write_snapshot(&self, wtxn: &mut RwTxn, snapshot: &ChainSnapshot) -> Result<usize, StoreError> {
        let bytes = snapshot
            .to_bytes()
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.snapshots_db
            .put(wtxn, LATEST_SNAPSHOT_KEY, &bytes)
            .map_err(LmdbError::from)?;
        Ok(bytes.len())
    }
}

impl ChainStore for LmdbChainStore {
    fn put_snapshot(&self, snapshot: &ChainSnapshot) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let bytes = self.write_snapshot(&mut wtxn, snapshot)?;
        wtxn.commit().map_err(LmdbError::from)?;
        tracing::debug!(
            assertions = snapshot.assertion_count(),
            bytes,
            "snapshot written"
        );
        Ok(())
    }

    fn get_snapshot(&self) -> Result<Option<ChainSnapshot>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let Some(bytes) = self
            .snapshots_db
            .get(&rtxn, LATEST_SNAPSHOT_KEY)
            .map_err(LmdbError::from)?
        else {
            return Ok(None);
        };
        let snapshot = ChainSnapshot::from_bytes(bytes)
            .map_err(|e| StoreError::Corruption(e.to_string()))?;
        Ok(Some(snapshot))
    }

    fn put_event(&self, event: &RollupEvent) -> Result<u64, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let seq = self.append_event(&mut wtxn, event)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(seq)
    }

    /// All events land in one write transaction.
    fn put_events(&self, events: &[RollupEvent]) -> Result<u64, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let first = self.events_db.len(&wtxn).map_err(LmdbError::from)?;
        for event in events {
            self.append_event(&mut wtxn, event)?;
        }
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(first)
    }

    fn events_since(&self, from: u64, limit: usize) -> Result<Vec<(u64, RollupEvent)>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let start = from.to_be_bytes();
        let range: (Bound<&[u8]>, Bound<&[u8]>) = (Bound::Included(&start[..]), Bound::Unbounded);
        let iter = self
            .events_db
            .range(&rtxn, &range)
            .map_err(LmdbError::from)?;

        let mut out = Vec::new();
        for item in iter.take(limit) {
            let (key, value) = item.map_err(LmdbError::from)?;
            let key = <[u8; 8]>::try_from(key)
                .map_err(|_| StoreError::Corruption("event key is not 8 bytes".to_string()))?;
            let event: RollupEvent = bincode::deserialize(value).map_err(LmdbError::from)?;
            out.push((u64::from_be_bytes(key), event));
        }
        Ok(out)
    }

    fn event_count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(self.events_db.len(&rtxn).map_err(LmdbError::from)?)
    }

    fn put_assertion(&self, node: &AssertionNode) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.write_assertion(&mut wtxn, node)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get_assertion(&self, id: &AssertionId) -> Result<AssertionNode, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let bytes = self
            .assertions_db
            .get(&rtxn, id.as_bytes())
            .map_err(LmdbError::from)?
            .ok_or_else(|| LmdbError::NotFound(format!("assertion {id}")))?;
        Ok(bincode::deserialize(bytes).map_err(LmdbError::from)?)
    }

    fn assertion_count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(self.assertions_db.len(&rtxn).map_err(LmdbError::from)?)
    }

    /// One write transaction; dropping it on an error aborts every part.
    fn write_batch(&self, batch: ChainWrite<'_>) -> Result<u64, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let first = self.events_db.len(&wtxn).map_err(LmdbError::from)?;
        for event in batch.events {
            self.append_event(&mut wtxn, event)?;
        }
        for node in batch.assertions {
            self.write_assertion(&mut wtxn, node)?;
        }
        let bytes = self.write_snapshot(&mut wtxn, batch.snapshot)?;
        wtxn.commit().map_err(LmdbError::from)?;
        tracing::debug!(
            first,
            events = batch.events.len(),
            records = batch.assertions.len(),
            snapshot_bytes = bytes,
            "chain batch written"
        );
        Ok(first)
    }
}
