//! Nullable database — thread-safe in-memory storage for testing.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use huc_store::{Database, DatabaseOpener, StoreError};
use parking_lot::Mutex;

use crate::CallJournal;

type Table = Arc<Mutex<BTreeMap<Vec<u8>, Vec<u8>>>>;

/// An in-memory database. Handles created by [`reopen`](Self::reopen) share
/// contents but close independently, like reopening a file.
pub struct NullDatabase {
    data: Table,
    closed: AtomicBool,
    journal: CallJournal,
}

impl NullDatabase {
    pub fn new() -> Self {
        Self {
            data: Arc::new(Mutex::new(BTreeMap::new())),
            closed: AtomicBool::new(false),
            journal: CallJournal::default(),
        }
    }

    pub fn with_journal(mut self, journal: CallJournal) -> Self {
        self.journal = journal;
        self
    }

    /// A fresh open handle on the same contents.
    pub fn reopen(&self) -> Self {
        Self {
            data: self.data.clone(),
            closed: AtomicBool::new(false),
            journal: self.journal.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.lock().is_empty()
    }

    fn check_open(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }
}

impl Default for NullDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl Database for NullDatabase {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        self.check_open()?;
        Ok(self.data.lock().get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.check_open()?;
        self.data.lock().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<(), StoreError> {
        self.check_open()?;
        self.data.lock().remove(key);
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &[u8]) -> Result<Vec<Vec<u8>>, StoreError> {
        self.check_open()?;
        Ok(self
            .data
            .lock()
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.journal.record("database closed");
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// Hands out [`NullDatabase`] handles by name. Opening the same name twice
/// yields handles over the same contents, so a test can "restart" a node.
#[derive(Default)]
pub struct NullDatabaseOpener {
    tables: Mutex<HashMap<String, Arc<NullDatabase>>>,
    opened: Mutex<Vec<(String, usize, usize)>>,
    fail: AtomicBool,
    journal: CallJournal,
}

impl NullDatabaseOpener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handles opened from now on record their close in `journal`.
    pub fn with_journal(mut self, journal: CallJournal) -> Self {
        self.journal = journal;
        self
    }

    /// Make every subsequent `open` fail.
    pub fn fail_opens(&self, fail: bool) {
        self.fail.store(fail, Ordering::Relaxed);
    }

    /// `(name, cache, handles)` of every successful open, in order.
    pub fn opened(&self) -> Vec<(String, usize, usize)> {
        self.opened.lock().clone()
    }

    /// The most recently opened handle for `name`.
    pub fn handle(&self, name: &str) -> Option<Arc<NullDatabase>> {
        self.tables.lock().get(name).cloned()
    }
}

impl DatabaseOpener for NullDatabaseOpener {
    fn open(&self, name: &str, cache_mb: usize, handles: usize) -> Result<Arc<dyn Database>, StoreError> {
        if self.fail.load(Ordering::Relaxed) {
            return Err(StoreError::Backend(format!("cannot open {name}")));
        }
        let mut tables = self.tables.lock();
        let db = match tables.get(name) {
            Some(existing) => Arc::new(existing.reopen()),
            None => Arc::new(NullDatabase::new().with_journal(self.journal.clone())),
        };
        tables.insert(name.to_string(), db.clone());
        self.opened.lock().push((name.to_string(), cache_mb, handles));
        Ok(db)
    }
}
