//! Nullable store: thread-safe in-memory storage for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use vigil_rollup::{AssertionNode, ChainSnapshot, RollupEvent};
use vigil_store::{ChainStore, ChainWrite, MetaStore, StoreError};
use vigil_types::AssertionId;

/// An in-memory chain and meta store.
/// Thread-safe for use with tokio's multi-threaded runtime.
///
/// [`NullStore::fail_writes`] makes every chain write return
/// [`StoreError::Backend`] without storing anything, like a full disk.
#[derive(Default)]
pub struct NullStore {
    snapshot: Mutex<Option<ChainSnapshot>>,
    events: Mutex<Vec<RollupEvent>>,
    assertions: Mutex<HashMap<AssertionId, AssertionNode>>,
    meta: Mutex<HashMap<String, Vec<u8>>>,
    failing: AtomicBool,
}

impl NullStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("write refused: disk full".to_string()));
        }
        Ok(())
    }
}

impl ChainStore for NullStore {
    fn put_snapshot(&self, snapshot: &ChainSnapshot) -> Result<(), StoreError> {
        self.check_writable()?;
        *self.snapshot.lock().unwrap() = Some(snapshot.clone());
        Ok(())
    }

    fn get_snapshot(&self) -> Result<Option<ChainSnapshot>, StoreError> {
        Ok(self.snapshot.lock().unwrap().clone())
    }

    fn put_event(&self, event: &RollupEvent) -> Result<u64, StoreError> {
        self.check_writable()?;
        let mut events = self.events.lock().unwrap();
        events.push(event.clone());
        Ok(events.len() as u64 - 1)
    }

    fn events_since(&self, from: u64, limit: usize) -> Result<Vec<(u64, RollupEvent)>, StoreError> {
        Ok(self
            .events
            .lock()
            .unwrap()
            .iter()
            .enumerate()
            .map(|(seq, event)| (seq as u64, event.clone()))
            .skip_while(|(seq, _)| *seq < from)
            .take(limit)
            .collect())
    }

    fn event_count(&self) -> Result<u64, StoreError> {
        Ok(self.events.lock().unwrap().len() as u64)
    }

    fn put_assertion(&self, node: &AssertionNode) -> Result<(), StoreError> {
        self.check_writable()?;
        self.assertions
            .lock()
            .unwrap()
            .insert(node.id(), node.clone());
        Ok(())
    }

    fn get_assertion(&self, id: &AssertionId) -> Result<AssertionNode, StoreError> {
        self.assertions
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("assertion {id}")))
    }

    fn assertion_count(&self) -> Result<u64, StoreError> {
        Ok(self.assertions.lock().unwrap().len() as u64)
    }

    fn write_batch(&self, batch: ChainWrite<'_>) -> Result<u64, StoreError> {
        self.check_writable()?;
        let mut events = self.events.lock().unwrap();
        let mut assertions = self.assertions.lock().unwrap();
        let mut snapshot = self.snapshot.lock().unwrap();
        let first = events.len() as u64;
        events.extend_from_slice(batch.events);
        for node in batch.assertions {
            assertions.insert(node.id(), node.clone());
        }
        *snapshot = Some(batch.snapshot.clone());
        Ok(first)
    }
}

impl MetaStore for NullStore {
    fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.meta
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn get_meta(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        self.meta
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("meta key '{key}'")))
    }

    fn delete_meta(&self, key: &str) -> Result<(), StoreError> {
        self.meta.lock().unwrap().remove(key);
        Ok(())
    }

    fn get_schema_version(&self) -> Result<u32, StoreError> {
        match self.meta.lock().unwrap().get("schema_version") {
            Some(bytes) => {
                let arr = <[u8; 4]>::try_from(bytes.as_slice())
                    .map_err(|_| StoreError::Serialization("bad schema_version".to_string()))?;
                Ok(u32::from_le_bytes(arr))
            }
            None => Ok(0),
        }
    }

    fn set_schema_version(&self, version: u32) -> Result<(), StoreError> {
        self.put_meta("schema_version", &version.to_le_bytes())
    }
}
