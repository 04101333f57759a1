//! Error type for the shared value types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VigilError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid hash: {0}")]
    InvalidHash(String),

    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}
