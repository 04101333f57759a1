//! Shared utilities for the vigil rollup.

pub mod blocks;
pub mod logging;
pub mod stats;

pub use blocks::{blocks_until, format_blocks};
pub use logging::env_filter;
pub use stats::StatsCounter;
