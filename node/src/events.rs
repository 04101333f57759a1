//! Fan-out of chain events to in-process subscribers.

use vigil_rollup::RollupEvent;

/// Called with each event and its sequence number in the event log.
pub type Listener = Box<dyn Fn(u64, &RollupEvent) + Send + Sync>;

/// Synchronous fan-out event bus.
///
/// Listeners run inline on the crank task while the chain is locked; keep
/// them fast.
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<Listener>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: Listener) {
        self.listeners.push(listener);
    }

    pub fn emit(&self, seq: u64, event: &RollupEvent) {
        for listener in &self.listeners {
            listener(seq, event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

/// A listener that logs each event as one JSON object.
pub fn json_logger() -> Listener {
    Box::new(|seq, event| match serde_json::to_string(event) {
        Ok(json) => tracing::info!(target: "vigil::events", seq, event = %json),
        Err(e) => tracing::warn!(seq, error = %e, "event is not representable as JSON"),
    })
}
