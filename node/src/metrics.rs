//! Prometheus metrics for the vigil node.
//!
//! [`NodeMetrics`] owns a dedicated [`Registry`]; [`NodeMetrics::encode`]
//! renders it in the Prometheus text exposition format.

use prometheus::{
    register_histogram_with_registry, register_int_counter_with_registry,
    register_int_gauge_with_registry, Encoder, Histogram, HistogramOpts, IntCounter, IntGauge,
    Opts, Registry, TextEncoder,
};

use vigil_rollup::{AssertionChain, RollupEvent};

use crate::NodeError;

pub struct NodeMetrics {
    pub registry: Registry,

    // --- counters ---
    pub assertions_created: IntCounter,
    pub assertions_confirmed: IntCounter,
    pub assertions_rejected: IntCounter,
    pub challenges_started: IntCounter,
    pub challenges_resolved: IntCounter,
    pub crank_ticks: IntCounter,
    pub crank_failures: IntCounter,

    // --- gauges ---
    pub staker_count: IntGauge,
    pub zombie_count: IntGauge,
    pub latest_confirmed_seq: IntGauge,
    pub active_challenges: IntGauge,

    /// Wall time of one crank tick, in milliseconds.
    pub tick_duration_ms: Histogram,
}

macro_rules! counter {
    ($registry:expr, $name:literal, $help:literal) => {
        register_int_counter_with_registry!(Opts::new($name, $help), $registry)
            .expect(concat!("failed to register ", $name))
    };
}

macro_rules! gauge {
    ($registry:expr, $name:literal, $help:literal) => {
        register_int_gauge_with_registry!(Opts::new($name, $help), $registry)
            .expect(concat!("failed to register ", $name))
    };
}

impl NodeMetrics {
    /// Create a fresh set of metrics, all registered under a new
    /// [`Registry`].
    pub fn new() -> Self {
        let registry = Registry::new();

        let assertions_created = counter!(
            registry,
            "vigil_assertions_created_total",
            "Assertions added to the chain"
        );
        let assertions_confirmed = counter!(
            registry,
            "vigil_assertions_confirmed_total",
            "Assertions confirmed"
        );
        let assertions_rejected = counter!(
            registry,
            "vigil_assertions_rejected_total",
            "Assertions rejected"
        );
        let challenges_started = counter!(
            registry,
            "vigil_challenges_started_total",
            "Challenges opened between rival stakers"
        );
        let challenges_resolved = counter!(
            registry,
            "vigil_challenges_resolved_total",
            "Challenges that produced a winner"
        );
        let crank_ticks = counter!(registry, "vigil_crank_ticks_total", "Crank ticks run");
        let crank_failures = counter!(
            registry,
            "vigil_crank_failures_total",
            "Crank ticks that returned an error"
        );

        let staker_count = gauge!(registry, "vigil_staker_count", "Live stakers");
        let zombie_count = gauge!(registry, "vigil_zombie_count", "Zombies not yet removed");
        let latest_confirmed_seq = gauge!(
            registry,
            "vigil_latest_confirmed_seq",
            "Sequence number of the latest confirmed assertion"
        );
        let active_challenges = gauge!(
            registry,
            "vigil_active_challenges",
            "Challenges still being played"
        );

        let tick_duration_ms = register_histogram_with_registry!(
            HistogramOpts::new("vigil_tick_duration_ms", "Crank tick time in milliseconds")
                .buckets(
                    prometheus::exponential_buckets(0.1, 2.0, 15)
                        .expect("valid histogram buckets")
                ),
            registry
        )
        .expect("failed to register tick_duration_ms histogram");

        Self {
            registry,
            assertions_created,
            assertions_confirmed,
            assertions_rejected,
            challenges_started,
            challenges_resolved,
            crank_ticks,
            crank_failures,
            staker_count,
            zombie_count,
            latest_confirmed_seq,
            active_challenges,
            tick_duration_ms,
        }
    }

    /// Count one chain event.
    pub fn observe(&self, event: &RollupEvent) {
        match event {
            RollupEvent::AssertionCreated { .. } => self.assertions_created.inc(),
            RollupEvent::AssertionConfirmed { .. } => self.assertions_confirmed.inc(),
            RollupEvent::AssertionRejected { .. } => self.assertions_rejected.inc(),
            RollupEvent::ChallengeStarted { .. } => self.challenges_started.inc(),
            RollupEvent::ChallengeResolved { .. } => self.challenges_resolved.inc(),
            _ => {}
        }
    }

    /// Refresh every gauge from the chain.
    pub fn update_gauges(&self, chain: &AssertionChain) {
        self.staker_count.set(gauge_value(chain.staker_count() as u64));
        self.zombie_count.set(gauge_value(chain.zombie_count() as u64));
        self.latest_confirmed_seq
            .set(gauge_value(chain.latest_confirmed_seq()));
        self.active_challenges
            .set(gauge_value(chain.challenges().active_challenges().count() as u64));
    }

    pub fn encode(&self) -> Result<String, NodeError> {
        let mut buf = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buf)
            .map_err(|e| NodeError::Metrics(e.to_string()))?;
        String::from_utf8(buf).map_err(|e| NodeError::Metrics(e.to_string()))
    }
}

fn gauge_value(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}

impl Default for NodeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_types::{AssertionId, RollupParams};

    #[test]
    fn events_drive_counters() {
        let metrics = NodeMetrics::new();
        metrics.observe(&RollupEvent::AssertionRejected {
            id: AssertionId::ZERO,
        });
        metrics.observe(&RollupEvent::Paused);
        assert_eq!(metrics.assertions_rejected.get(), 1);
        assert_eq!(metrics.assertions_created.get(), 0);
    }

    #[test]
    fn gauges_follow_the_chain() {
        let metrics = NodeMetrics::new();
        let chain = AssertionChain::new(RollupParams::dev()).unwrap();
        metrics.staker_count.set(9);
        metrics.update_gauges(&chain);
        assert_eq!(metrics.staker_count.get(), 0);
        assert_eq!(metrics.latest_confirmed_seq.get(), 0);
    }

    #[test]
    fn text_exposition_names_metrics() {
        let metrics = NodeMetrics::new();
        metrics.crank_ticks.inc();
        let text = metrics.encode().unwrap();
        assert!(text.contains("vigil_crank_ticks_total 1"));
        assert!(text.contains("vigil_active_challenges"));
    }
}
