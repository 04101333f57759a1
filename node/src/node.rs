//! The node: opens storage, restores or creates the chain and runs the
//! crank driver until shut down.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use vigil_rollup::AssertionChain;
use vigil_store::{ChainStore, StoreError};
use vigil_store_lmdb::{check_data_dir, check_integrity, LmdbChainStore, LmdbEnvironment};
use vigil_types::BlockClock;

use crate::config::NodeConfig;
use crate::crank::{ConfirmDataProvider, CrankDriver, DriverOptions};
use crate::error::NodeError;
use crate::events::json_logger;
use crate::logging::init_logging;
use crate::metrics::NodeMetrics;
use crate::shutdown::{ShutdownController, ShutdownReason};

/// Timeout for the crank task to finish during shutdown.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

pub struct VigilNode {
    config: NodeConfig,
    driver: Arc<CrankDriver<LmdbChainStore>>,
    metrics: Option<Arc<NodeMetrics>>,
    shutdown: Arc<ShutdownController>,
    task: Option<JoinHandle<()>>,
}

impl VigilNode {
    /// Install logging, open the LMDB environment at `config.data_dir` and
    /// load the chain.
    ///
    /// A stored snapshot wins over the configured parameters; a fresh data
    /// directory starts a new chain from them.
    pub async fn open(
        config: NodeConfig,
        clock: Arc<dyn BlockClock>,
        confirm: Arc<dyn ConfirmDataProvider>,
    ) -> Result<Self, NodeError> {
        let params = config.rollup.to_params()?;
        let options = DriverOptions::from_config(&config)?;
        let log_format = config.log_format()?;

        // An embedding process may have installed its own subscriber.
        match init_logging(log_format, &config.log_level) {
            Ok(()) => tracing::info!(format = ?log_format, level = %config.log_level, "logging initialised"),
            Err(e) => tracing::debug!(error = %e, "keeping the existing tracing subscriber"),
        }

        check_data_dir(&config.data_dir).map_err(StoreError::from)?;
        let env = LmdbEnvironment::open(&config.data_dir, config.map_size)?;
        let report = check_integrity(env.env()).map_err(StoreError::from)?;
        if !report.is_healthy() {
            return Err(StoreError::Corruption(report.errors.join("; ")).into());
        }
        tracing::debug!(
            databases = report.databases_checked,
            entries = report.total_entries,
            "integrity check passed"
        );

        let store = env.chain_store();
        let chain = match store.get_snapshot()? {
            Some(snapshot) => {
                let chain = AssertionChain::restore(snapshot)?;
                if chain.params() != &params {
                    tracing::warn!("stored chain parameters differ from the config; using stored");
                }
                tracing::info!(
                    assertions = chain.assertion_count(),
                    latest_confirmed = chain.latest_confirmed_seq(),
                    "chain restored"
                );
                chain
            }
            None => {
                let chain = AssertionChain::new(params)?;
                store.put_snapshot(&chain.snapshot()?)?;
                tracing::info!(genesis = %chain.genesis(), "new chain initialised");
                chain
            }
        };

        let metrics = config.enable_metrics.then(|| {
            let metrics = Arc::new(NodeMetrics::new());
            metrics.update_gauges(&chain);
            metrics
        });
        let driver = CrankDriver::new(chain, store, clock, confirm, metrics.clone(), options);
        if config.log_events {
            driver.subscribe(json_logger()).await;
        }

        Ok(Self {
            config,
            driver: Arc::new(driver),
            metrics,
            shutdown: Arc::new(ShutdownController::new()),
            task: None,
        })
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn driver(&self) -> &Arc<CrankDriver<LmdbChainStore>> {
        &self.driver
    }

    /// `None` unless `enable_metrics` is set.
    pub fn metrics(&self) -> Option<&Arc<NodeMetrics>> {
        self.metrics.as_ref()
    }

    pub fn shutdown_controller(&self) -> &Arc<ShutdownController> {
        &self.shutdown
    }

    /// Spawn the crank loop. Does nothing if it is already running.
    pub fn start(&mut self) {
        if self.task.is_some() {
            return;
        }
        let driver = Arc::clone(&self.driver);
        let rx = self.shutdown.subscribe();
        self.task = Some(tokio::spawn(async move { driver.run(rx).await }));
        tracing::info!(data_dir = %self.config.data_dir.display(), "node started");
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Signal shutdown and wait for the crank loop to exit.
    pub async fn stop(&mut self) -> Result<(), NodeError> {
        self.shutdown.trigger(ShutdownReason::Requested);
        if let Some(task) = self.task.take() {
            tokio::time::timeout(SHUTDOWN_TIMEOUT, task)
                .await
                .map_err(|_| NodeError::ShutdownTimeout)?
                .map_err(|e| NodeError::Other(e.to_string()))?;
        }
        tracing::info!(reason = ?self.shutdown.reason(), "node stopped");
        Ok(())
    }

    /// Run until SIGINT or SIGTERM, then stop.
    pub async fn run_until_signal(&mut self) -> Result<(), NodeError> {
        self.start();
        self.shutdown.wait_for_signal().await;
        self.stop().await
    }
}
