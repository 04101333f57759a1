//! Log filter shared by everything that installs a `tracing` subscriber.

use tracing_subscriber::EnvFilter;

/// The filter from `RUST_LOG`, or `default` when it is unset or invalid.
pub fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}
