//! vigil validator node.
//!
//! Hosts one assertion chain: it keeps the chain in LMDB, calls the
//! permissionless cranks (challenge timeouts, confirmation, rejection) on a
//! timer, and reports what happened through logs, Prometheus metrics and an
//! in-process event bus.

pub mod config;
pub mod crank;
pub mod error;
pub mod events;
pub mod logging;
pub mod metrics;
pub mod node;
pub mod shutdown;
pub mod tracing_spans;

pub use config::{NodeConfig, RollupConfig};
pub use crank::{
    ClaimedConfirmData, ConfirmDataProvider, CrankDriver, CrankStat, DriverOptions, TickReport,
};
pub use error::NodeError;
pub use events::{json_logger, EventBus, Listener};
pub use logging::{init_logging, LogFormat};
pub use metrics::NodeMetrics;
pub use node::VigilNode;
pub use shutdown::{ShutdownController, ShutdownReason, ShutdownSignal};
