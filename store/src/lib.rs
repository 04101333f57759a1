//! Abstract storage traits for the vigil rollup.
//!
//! A validator persists the chain it drives: the latest snapshot to resume
//! from, an append-only log of every event, and per-assertion records for
//! off-chain readers. Backends implement these traits; the node depends only
//! on the traits.

pub mod chain;
pub mod error;
pub mod meta;

pub use chain::{ChainStore, ChainWrite};
pub use error::StoreError;
pub use meta::MetaStore;
