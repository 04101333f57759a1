use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("rollup error: {0}")]
    Rollup(#[from] vigil_rollup::RollupError),

    #[error("store error: {0}")]
    Store(#[from] vigil_store::StoreError),

    #[error("config error: {0}")]
    Config(String),

    #[error("logging error: {0}")]
    Logging(String),

    #[error("metrics error: {0}")]
    Metrics(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("shutdown timeout")]
    ShutdownTimeout,

    #[error("{0}")]
    Other(String),
}
