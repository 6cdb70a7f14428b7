//! LMDB environment setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use heed::{Env, EnvOpenOptions};
use huc_store::{Database, DatabaseOpener, StoreError};

use crate::{LmdbDatabase, LmdbError};

/// Smallest map size handed to LMDB, regardless of the cache hint.
const MIN_MAP_SIZE: usize = 64 * 1024 * 1024;

/// Upper bound on the map size so a large cache hint cannot exhaust
/// address space on 32-bit hosts.
const MAX_MAP_SIZE: usize = 1 << 40;

const MIN_READERS: u32 = 16;

/// Wraps an open LMDB environment.
pub struct LmdbEnvironment {
    env: Arc<Env>,
    path: PathBuf,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path.
    pub fn open(path: &Path, max_dbs: u32, map_size: usize, max_readers: u32) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;
        // SAFETY: each environment directory is opened once per process by
        // `LmdbOpener`; LMDB forbids opening the same path twice.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size.clamp(MIN_MAP_SIZE, MAX_MAP_SIZE))
                .max_dbs(max_dbs)
                .max_readers(max_readers.max(MIN_READERS))
                .open(path)?
        };
        Ok(Self {
            env: Arc::new(env),
            path: path.to_path_buf(),
        })
    }

    pub fn env(&self) -> &Arc<Env> {
        &self.env
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Opens named databases as subdirectories of a root directory.
pub struct LmdbOpener {
    root_dir: PathBuf,
}

impl LmdbOpener {
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }
}

impl DatabaseOpener for LmdbOpener {
    fn open(&self, name: &str, cache_mb: usize, handles: usize) -> Result<Arc<dyn Database>, StoreError> {
        let path = self.root_dir.join(name);
        let map_size = cache_mb.saturating_mul(1024 * 1024).saturating_mul(16);
        let readers = u32::try_from(handles).unwrap_or(u32::MAX);
        let environment = LmdbEnvironment::open(&path, 1, map_size, readers)?;
        tracing::info!(
            database = name,
            path = %path.display(),
            cache_mb,
            handles,
            "opened LMDB database"
        );
        Ok(Arc::new(LmdbDatabase::new(environment, name)?))
    }
}
