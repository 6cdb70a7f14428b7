//! The key-value database contract.

use std::sync::Arc;

use crate::StoreError;

/// A byte-oriented key-value database.
///
/// Implementations synchronise internally; a handle is shared between the
/// chain, the bloom handlers and the migration task behind an `Arc`.
pub trait Database: Send + Sync {
    /// Retrieve a value. Absence is `Ok(None)`.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    /// Insert or overwrite a value.
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError>;

    /// Remove a value. Removing an absent key is not an error.
    fn delete(&self, key: &[u8]) -> Result<(), StoreError>;

    /// Check if a key exists.
    fn has(&self, key: &[u8]) -> Result<bool, StoreError> {
        Ok(self.get(key)?.is_some())
    }

    /// All keys starting with `prefix`, in ascending byte order.
    fn keys_with_prefix(&self, prefix: &[u8]) -> Result<Vec<Vec<u8>>, StoreError>;

    /// Release the handle. Later operations fail with [`StoreError::Closed`].
    fn close(&self);

    fn is_closed(&self) -> bool;
}

/// Opens or creates a named database.
pub trait DatabaseOpener: Send + Sync {
    /// `cache_mb` and `handles` are sizing hints; backends may ignore them.
    fn open(&self, name: &str, cache_mb: usize, handles: usize)
        -> Result<Arc<dyn Database>, StoreError>;
}
