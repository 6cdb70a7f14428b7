//! What the hosting process hands a node at construction.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use huc_core::{EventMux, Manager, SubsystemBuilder};
use huc_store::{Database, DatabaseOpener, StoreError};

/// Shared services owned by the host, not by the node.
pub struct ServiceContext {
    /// Root for relative paths (ethash caches, tx journal). `None` runs
    /// everything in memory.
    pub data_dir: Option<PathBuf>,
    pub opener: Arc<dyn DatabaseOpener>,
    pub account_manager: Arc<Manager>,
    pub event_mux: Arc<EventMux>,
    pub subsystems: Arc<dyn SubsystemBuilder>,
}

impl ServiceContext {
    pub fn new(
        data_dir: Option<PathBuf>,
        opener: Arc<dyn DatabaseOpener>,
        account_manager: Arc<Manager>,
        subsystems: Arc<dyn SubsystemBuilder>,
    ) -> Self {
        Self {
            data_dir,
            opener,
            account_manager,
            event_mux: Arc::new(EventMux::new()),
            subsystems,
        }
    }

    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    /// `path` anchored at the data directory when it is relative.
    pub fn resolve_path(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        match &self.data_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Open (or create) a named database.
    pub fn open_database(
        &self,
        name: &str,
        cache_mb: usize,
        handles: usize,
    ) -> Result<Arc<dyn Database>, StoreError> {
        tracing::debug!(name, cache_mb, handles, "opening database");
        self.opener.open(name, cache_mb, handles)
    }
}
