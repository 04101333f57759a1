//! LMDB environment setup.

use std::path::Path;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use vigil_store::StoreError;

use crate::chain::LmdbChainStore;
use crate::meta::LmdbMetaStore;
use crate::migration::Migrator;
use crate::LmdbError;

/// 1 GiB.
pub const DEFAULT_MAP_SIZE: usize = 1 << 30;

const MAX_DBS: u32 = 8;

/// Names of every database a valid environment holds.
pub(crate) const DATABASES: &[&str] = &["meta", "snapshots", "events", "assertions"];

/// Wraps the LMDB environment and all database handles.
pub struct LmdbEnvironment {
    env: Arc<Env>,
    meta_db: Database<Bytes, Bytes>,
    snapshots_db: Database<Bytes, Bytes>,
    events_db: Database<Bytes, Bytes>,
    assertions_db: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an environment under `path`, creating the directory
    /// and every database, then bring the schema up to date.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, StoreError> {
        std::fs::create_dir_all(path).map_err(|e| LmdbError::Io(e.to_string()))?;
        // SAFETY: the environment is opened once per directory by this
        // process and the memory map is never modified outside heed.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(MAX_DBS)
                .open(path)
        }
        .map_err(LmdbError::from)?;

        let mut wtxn = env.write_txn().map_err(LmdbError::from)?;
        let meta_db: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, Some("meta"))
            .map_err(LmdbError::from)?;
        let snapshots_db: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, Some("snapshots"))
            .map_err(LmdbError::from)?;
        let events_db: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, Some("events"))
            .map_err(LmdbError::from)?;
        let assertions_db: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, Some("assertions"))
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;

        let environment = Self {
            env: Arc::new(env),
            meta_db,
            snapshots_db,
            events_db,
            assertions_db,
        };
        Migrator::run(&environment.meta_store())?;
        tracing::info!(path = %path.display(), map_size, "LMDB environment opened");
        Ok(environment)
    }

    pub fn env(&self) -> &Arc<Env> {
        &self.env
    }

    pub fn meta_store(&self) -> LmdbMetaStore {
        LmdbMetaStore {
            env: Arc::clone(&self.env),
            meta_db: self.meta_db,
        }
    }

    pub fn chain_store(&self) -> LmdbChainStore {
        LmdbChainStore {
            env: Arc::clone(&self.env),
            snapshots_db: self.snapshots_db,
            events_db: self.events_db,
            assertions_db: self.assertions_db,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::CURRENT_SCHEMA_VERSION;
    use vigil_store::MetaStore;

    #[test]
    fn fresh_environment_is_migrated() {
        let dir = tempfile::tempdir().unwrap();
        let env = LmdbEnvironment::open(&dir.path().join("db"), 1 << 24).unwrap();
        assert_eq!(
            env.meta_store().get_schema_version().unwrap(),
            CURRENT_SCHEMA_VERSION
        );
        let report = crate::check_integrity(env.env()).unwrap();
        assert!(report.is_healthy());
        assert_eq!(report.databases_checked, DATABASES.len() as u32);
    }

    #[test]
    fn newer_schema_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        {
            let env = LmdbEnvironment::open(dir.path(), 1 << 24).unwrap();
            env.meta_store()
                .set_schema_version(CURRENT_SCHEMA_VERSION + 1)
                .unwrap();
        }
        assert!(matches!(
            LmdbEnvironment::open(dir.path(), 1 << 24),
            Err(StoreError::SchemaTooNew { .. })
        ));
    }
}
