//! Storage abstraction for the HappyUC node.
//!
//! Every backend (LMDB on disk, in-memory for testing) implements the
//! [`Database`] trait. Chain data is laid out on top of it by the typed
//! accessor modules; the rest of the codebase never builds keys by hand.

pub mod bloombits;
pub mod chain;
pub mod database;
pub mod error;
pub mod lookup;
pub mod meta;
pub mod schema;
pub mod state;

pub use database::{Database, DatabaseOpener};
pub use error::StoreError;
pub use lookup::{LegacyTxEntry, TxLookupEntry};

pub(crate) fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
    Ok(bincode::serialize(value)?)
}

pub(crate) fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
    Ok(bincode::deserialize(bytes)?)
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::BTreeMap;

    use parking_lot::Mutex;

    use crate::{Database, StoreError};

    /// Minimal ordered map used by the accessor tests.
    #[derive(Default)]
    pub struct MapDb(Mutex<BTreeMap<Vec<u8>, Vec<u8>>>);

    impl Database for MapDb {
        fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
            Ok(self.0.lock().get(key).cloned())
        }

        fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
            self.0.lock().insert(key.to_vec(), value.to_vec());
            Ok(())
        }

        fn delete(&self, key: &[u8]) -> Result<(), StoreError> {
            self.0.lock().remove(key);
            Ok(())
        }

        fn keys_with_prefix(&self, prefix: &[u8]) -> Result<Vec<Vec<u8>>, StoreError> {
            Ok(self
                .0
                .lock()
                .keys()
                .filter(|k| k.starts_with(prefix))
                .cloned()
                .collect())
        }

        fn close(&self) {}

        fn is_closed(&self) -> bool {
            false
        }
    }
}
