//! LMDB implementation of the `Database` trait.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use heed::types::Bytes;
use heed::Env;

use huc_store::{Database, StoreError};

use crate::{LmdbEnvironment, LmdbError};

pub struct LmdbDatabase {
    env: Arc<Env>,
    db: heed::Database<Bytes, Bytes>,
    closed: AtomicBool,
}

impl LmdbDatabase {
    /// Create (or open) the named table inside the environment.
    pub fn new(environment: LmdbEnvironment, name: &str) -> Result<Self, LmdbError> {
        let env = environment.env().clone();
        let mut wtxn = env.write_txn()?;
        let db: heed::Database<Bytes, Bytes> = env.create_database(&mut wtxn, Some(name))?;
        wtxn.commit()?;
        Ok(Self {
            env,
            db,
            closed: AtomicBool::new(false),
        })
    }

    fn check_open(&self) -> Result<(), LmdbError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(LmdbError::Closed);
        }
        Ok(())
    }

    /// Number of entries in the table.
    pub fn len(&self) -> Result<u64, StoreError> {
        self.check_open()?;
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(self.db.len(&rtxn).map_err(LmdbError::from)?)
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}

impl Database for LmdbDatabase {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        self.check_open()?;
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self.db.get(&rtxn, key).map_err(LmdbError::from)?;
        Ok(val.map(|v| v.to_vec()))
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.check_open()?;
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.db.put(&mut wtxn, key, value).map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<(), StoreError> {
        self.check_open()?;
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.db.delete(&mut wtxn, key).map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &[u8]) -> Result<Vec<Vec<u8>>, StoreError> {
        self.check_open()?;
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let mut keys = Vec::new();
        let iter = self.db.prefix_iter(&rtxn, prefix).map_err(LmdbError::from)?;
        for result in iter {
            let (key, _) = result.map_err(LmdbError::from)?;
            keys.push(key.to_vec());
        }
        Ok(keys)
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            if let Err(e) = self.env.force_sync() {
                tracing::warn!(error = %e, "failed to sync LMDB environment on close");
            }
            tracing::debug!("LMDB database closed");
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
