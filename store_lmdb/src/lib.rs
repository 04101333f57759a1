//! LMDB storage backend for the vigil rollup.
//!
//! Implements the `vigil-store` traits with the `heed` LMDB bindings. All
//! stores share one environment; each keeps its records in its own named
//! database, encoded with bincode.

pub mod chain;
pub mod environment;
pub mod error;
pub mod integrity;
pub mod meta;
pub mod migration;

pub use chain::LmdbChainStore;
pub use environment::{LmdbEnvironment, DEFAULT_MAP_SIZE};
pub use error::LmdbError;
pub use integrity::{check_data_dir, check_integrity, IntegrityReport};
pub use meta::LmdbMetaStore;
pub use migration::{Migrator, CURRENT_SCHEMA_VERSION};
