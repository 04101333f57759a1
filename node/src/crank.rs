//! The crank driver: calls the chain's permissionless cranks on a timer and
//! persists everything they change.
//!
//! Each tick times out expired challenges, then resolves pending assertions
//! in creation order until one is not ready. The drained events, the records
//! they touched and a fresh snapshot are written in one store batch before
//! the events reach the metrics and the [`EventBus`]. If that write fails the
//! chain is put back as it was before the step.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;

use vigil_rollup::{AssertionChain, AssertionNode, RollupError, RollupEvent};
use vigil_store::{ChainStore, ChainWrite};
use vigil_types::{Address, AssertionId, BlockClock, BlockNumber, Bytes32, ChallengeId, Crank, NotYet};
use vigil_utils::{blocks_until, format_blocks, StatsCounter};

use crate::config::NodeConfig;
use crate::events::{EventBus, Listener};
use crate::metrics::NodeMetrics;
use crate::shutdown::ShutdownSignal;
use crate::tracing_spans;
use crate::NodeError;

/// Supplies the block hash and send root to confirm an assertion with.
pub trait ConfirmDataProvider: Send + Sync {
    /// `None` when this validator cannot vouch for the assertion.
    fn confirm_data(&self, node: &AssertionNode) -> Option<(Bytes32, Bytes32)>;
}

/// Confirms with the values the assertion itself claims.
///
/// Confirmation only succeeds once every rival has been beaten, so a node
/// that does not execute the chain itself can still crank it forward.
#[derive(Clone, Copy, Debug, Default)]
pub struct ClaimedConfirmData;

impl ConfirmDataProvider for ClaimedConfirmData {
    fn confirm_data(&self, node: &AssertionNode) -> Option<(Bytes32, Bytes32)> {
        let gs = &node.assertion.after_state.global_state;
        Some((gs.block_hash, gs.send_root))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CrankStat {
    Ticks,
    Timeouts,
    Confirmed,
    Rejected,
    Events,
}

const CRANK_STATS: &[CrankStat] = &[
    CrankStat::Ticks,
    CrankStat::Timeouts,
    CrankStat::Confirmed,
    CrankStat::Rejected,
    CrankStat::Events,
];

#[derive(Clone, Debug)]
pub struct DriverOptions {
    pub validator: Address,
    pub interval: Duration,
    pub max_resolutions_per_tick: usize,
    pub block_time_secs: u64,
}

impl DriverOptions {
    pub fn from_config(config: &NodeConfig) -> Result<Self, NodeError> {
        if config.crank_interval_ms == 0 {
            return Err(NodeError::Config("crank_interval_ms must be non-zero".into()));
        }
        Ok(Self {
            validator: config.validator_address()?,
            interval: Duration::from_millis(config.crank_interval_ms),
            max_resolutions_per_tick: config.max_resolutions_per_tick,
            block_time_secs: config.block_time_secs,
        })
    }
}

/// What one tick did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    pub now: BlockNumber,
    pub paused: bool,
    pub timeouts: Vec<ChallengeId>,
    pub confirmed: Vec<AssertionId>,
    pub rejected: Vec<AssertionId>,
    /// Events written to the store.
    pub events: usize,
}

struct DriverState {
    chain: AssertionChain,
    bus: EventBus,
}

pub struct CrankDriver<S> {
    state: Mutex<DriverState>,
    store: S,
    clock: Arc<dyn BlockClock>,
    confirm: Arc<dyn ConfirmDataProvider>,
    metrics: Option<Arc<NodeMetrics>>,
    stats: StatsCounter<CrankStat>,
    options: DriverOptions,
}

impl<S: ChainStore> CrankDriver<S> {
    pub fn new(
        chain: AssertionChain,
        store: S,
        clock: Arc<dyn BlockClock>,
        confirm: Arc<dyn ConfirmDataProvider>,
        metrics: Option<Arc<NodeMetrics>>,
        options: DriverOptions,
    ) -> Self {
        Self {
            state: Mutex::new(DriverState {
                chain,
                bus: EventBus::new(),
            }),
            store,
            clock,
            confirm,
            metrics,
            stats: StatsCounter::new(CRANK_STATS),
            options,
        }
    }

    pub async fn subscribe(&self, listener: Listener) {
        self.state.lock().await.bus.subscribe(listener);
    }

    pub fn stats(&self) -> &StatsCounter<CrankStat> {
        &self.stats
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn metrics(&self) -> Option<&Arc<NodeMetrics>> {
        self.metrics.as_ref()
    }

    fn record(&self, f: impl FnOnce(&NodeMetrics)) {
        if let Some(metrics) = &self.metrics {
            f(metrics);
        }
    }

    /// Run `op` against the chain at the current height, then persist what it
    /// changed. If the operation is refused or the store write fails, the
    /// chain is left as it was and the call can be retried.
    pub async fn apply<T>(
        &self,
        op_name: &str,
        op: impl FnOnce(&mut AssertionChain, BlockNumber) -> Result<T, RollupError>,
    ) -> Result<T, NodeError> {
        let mut state = self.state.lock().await;
        let now = self.clock.now();
        let span = tracing_spans::submit_span(op_name, now);
        let _guard = span.enter();

        let before = state.chain.clone();
        let value = match op(&mut state.chain, now) {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!(op = op_name, error = %e, "operation refused");
                return Err(e.into());
            }
        };
        if let Err(e) = self.flush(&mut state) {
            tracing::warn!(op = op_name, error = %e, "store write failed, operation rolled back");
            state.chain = before;
            return Err(e);
        }
        Ok(value)
    }

    /// Read from the chain without changing it.
    pub async fn read<T>(&self, f: impl FnOnce(&AssertionChain) -> T) -> T {
        f(&self.state.lock().await.chain)
    }

    /// Run the cranks once. A tick whose store write fails changes nothing,
    /// so the next tick redoes the same work.
    pub async fn tick(&self) -> Result<TickReport, NodeError> {
        let started = Instant::now();
        let mut state = self.state.lock().await;
        let now = self.clock.now();
        let before = state.chain.clone();
        let report = self.crank(&mut state, now);
        if report.is_err() {
            state.chain = before;
        }
        self.record(|m| {
            m.tick_duration_ms
                .observe(started.elapsed().as_secs_f64() * 1_000.0)
        });
        report
    }

    /// Tick every `interval` until `shutdown` is triggered.
    pub async fn run(&self, mut shutdown: ShutdownSignal) {
        if let Some(reason) = shutdown.reason() {
            tracing::info!(%reason, "shutdown already triggered, crank driver not started");
            return;
        }
        let mut ticker = tokio::time::interval(self.options.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(
            validator = %self.options.validator,
            interval_ms = self.options.interval.as_millis() as u64,
            "crank driver started"
        );
        loop {
            tokio::select! {
                biased;
                reason = shutdown.triggered() => {
                    tracing::info!(%reason, "crank driver stopping");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.tick().await {
                        self.record(|m| m.crank_failures.inc());
                        tracing::error!(error = %e, "crank tick failed");
                    }
                }
            }
        }
    }

    fn crank(&self, state: &mut DriverState, now: BlockNumber) -> Result<TickReport, NodeError> {
        let span = tracing_spans::crank_tick_span(now);
        let _guard = span.enter();

        let mut report = TickReport {
            now,
            ..TickReport::default()
        };
        if state.chain.is_paused() {
            tracing::debug!("chain paused, skipping cranks");
            report.paused = true;
        } else {
            report.timeouts = self.time_out_challenges(&mut state.chain, now);
            self.resolve_assertions(&mut state.chain, now, &mut report);
        }
        report.events = self.flush(state)?;

        self.record(|m| m.crank_ticks.inc());
        self.stats.increment(CrankStat::Ticks);
        self.stats.add(CrankStat::Timeouts, report.timeouts.len() as u64);
        self.stats.add(CrankStat::Confirmed, report.confirmed.len() as u64);
        self.stats.add(CrankStat::Rejected, report.rejected.len() as u64);
        Ok(report)
    }

    fn time_out_challenges(&self, chain: &mut AssertionChain, now: BlockNumber) -> Vec<ChallengeId> {
        let expired: Vec<ChallengeId> = chain
            .challenges()
            .active_challenges()
            .filter(|c| chain.is_timed_out(&c.id, now))
            .map(|c| c.id)
            .collect();

        let mut done = Vec::new();
        for id in expired {
            let span = tracing_spans::challenge_move_span(&id, "timeout");
            let _guard = span.enter();
            match chain.timeout_challenge(&id, now) {
                Ok(Crank::Done(outcome)) => {
                    tracing::info!(
                        winner = %outcome.winner.staker,
                        loser = %outcome.loser.staker,
                        "challenge timed out"
                    );
                    done.push(id);
                }
                Ok(Crank::NotYet(why)) => tracing::debug!(?why, "timeout not ready"),
                Err(e) => tracing::warn!(error = %e, "timeout failed"),
            }
        }
        done
    }

    /// Confirm or reject pending assertions in order, stopping at the first
    /// one that cannot be resolved yet.
    fn resolve_assertions(&self, chain: &mut AssertionChain, now: BlockNumber, report: &mut TickReport) {
        let validator = self.options.validator;
        for _ in 0..self.options.max_resolutions_per_tick {
            let Some(node) = chain.first_unresolved() else {
                break;
            };
            let id = node.id();
            let parent_confirmed = node.assertion.parent_id == chain.latest_confirmed();

            if parent_confirmed {
                if let Some((block_hash, send_root)) = self.confirm.confirm_data(node) {
                    match chain.confirm_next_assertion(&validator, block_hash, send_root, now) {
                        Ok(Crank::Done(id)) => {
                            report.confirmed.push(id);
                            continue;
                        }
                        Ok(Crank::NotYet(why)) => {
                            self.log_not_yet(&id, why, now);
                            break;
                        }
                        Err(e) => {
                            tracing::debug!(assertion = %id, error = %e, "cannot confirm, trying reject")
                        }
                    }
                }
            }

            // Rejecting under a confirmed parent needs a live staker on a
            // rival branch; under a rejected parent anyone will do.
            let staker = if parent_confirmed {
                match rival_staker(chain, &id) {
                    Some(staker) => staker,
                    None => break,
                }
            } else {
                validator
            };
            match chain.reject_next_assertion(&validator, &staker, now) {
                Ok(Crank::Done(id)) => report.rejected.push(id),
                Ok(Crank::NotYet(why)) => {
                    self.log_not_yet(&id, why, now);
                    break;
                }
                Err(e) => {
                    tracing::debug!(assertion = %id, error = %e, "cannot resolve yet");
                    break;
                }
            }
        }
    }

    fn log_not_yet(&self, id: &AssertionId, why: NotYet, now: BlockNumber) {
        let ready = match why {
            NotYet::BeforeDeadline { deadline } => deadline,
            NotYet::ChildTooRecent { ready_at } => ready_at,
            NotYet::NothingPending => return,
        };
        let wait = format_blocks(blocks_until(now, ready), self.options.block_time_secs);
        tracing::debug!(assertion = %id, %wait, "assertion not ready");
    }

    /// Write drained events, the records they touched and a new snapshot
    /// in one batch, then publish the events.
    ///
    /// The events are already drained when the write fails; callers restore
    /// the chain they cloned before the step.
    fn flush(&self, state: &mut DriverState) -> Result<usize, NodeError> {
        let events = state.chain.drain_events();
        if events.is_empty() {
            return Ok(0);
        }
        let mut touched: Vec<AssertionId> = events.iter().filter_map(touched_assertion).collect();
        touched.sort();
        touched.dedup();
        let records: Vec<AssertionNode> = touched
            .iter()
            .filter_map(|id| state.chain.assertion(id).cloned())
            .collect();
        let snapshot = state.chain.snapshot()?;
        let first = self.store.write_batch(ChainWrite {
            events: &events,
            assertions: &records,
            snapshot: &snapshot,
        })?;

        for (offset, event) in events.iter().enumerate() {
            self.record(|m| m.observe(event));
            state.bus.emit(first + offset as u64, event);
        }
        self.record(|m| m.update_gauges(&state.chain));
        self.stats.add(CrankStat::Events, events.len() as u64);
        Ok(events.len())
    }
}

/// Assertion whose stored record an event changes.
fn touched_assertion(event: &RollupEvent) -> Option<AssertionId> {
    match event {
        RollupEvent::AssertionCreated { assertion, .. } => Some(assertion.id),
        RollupEvent::AssertionConfirmed { id, .. } | RollupEvent::AssertionRejected { id } => {
            Some(*id)
        }
        RollupEvent::StakedOn { assertion, .. } => Some(*assertion),
        _ => None,
    }
}

/// A live staker whose latest stake is pending but not on `target`.
fn rival_staker(chain: &AssertionChain, target: &AssertionId) -> Option<Address> {
    let node = chain.assertion(target)?;
    chain
        .stakers()
        .find(|s| {
            !node.has_staker(&s.address)
                && chain
                    .assertion(&s.latest_staked)
                    .is_some_and(|latest| latest.is_pending())
        })
        .map(|s| s.address)
}
