//! In-memory doubles for the engine tests.

use std::collections::{BTreeMap, HashMap};

use huc_store::{Database, StoreError};
use huc_types::{ChainConfig, Hash, Header};
use parking_lot::Mutex;

use crate::ChainReader;

#[derive(Default)]
pub struct MemDb(Mutex<BTreeMap<Vec<u8>, Vec<u8>>>);

impl Database for MemDb {
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
        Ok(self.0.lock().keys().filter(|k| k.starts_with(prefix)).cloned().collect())
    }

    fn close(&self) {}

    fn is_closed(&self) -> bool {
        false
    }
}

/// A header chain holding only what tests insert.
pub struct MemChain {
    headers: Mutex<HashMap<Hash, Header>>,
    genesis: Header,
}

impl MemChain {
    pub fn with_genesis() -> Self {
        let genesis = Header {
            time: 1_000,
            ..Default::default()
        };
        let mut headers = HashMap::new();
        headers.insert(genesis.hash(), genesis.clone());
        Self {
            headers: Mutex::new(headers),
            genesis,
        }
    }

    pub fn genesis(&self) -> Header {
        self.genesis.clone()
    }
}

impl ChainReader for MemChain {
    fn config(&self) -> ChainConfig {
        ChainConfig::all_forks(1)
    }

    fn current_header(&self) -> Result<Option<Header>, StoreError> {
        Ok(self.headers.lock().values().max_by_key(|h| h.number).cloned())
    }

    fn header(&self, hash: &Hash, number: u64) -> Result<Option<Header>, StoreError> {
        Ok(self.headers.lock().get(hash).filter(|h| h.number == number).cloned())
    }

    fn header_by_number(&self, number: u64) -> Result<Option<Header>, StoreError> {
        Ok(self.headers.lock().values().find(|h| h.number == number).cloned())
    }

    fn header_by_hash(&self, hash: &Hash) -> Result<Option<Header>, StoreError> {
        Ok(self.headers.lock().get(hash).cloned())
    }
}
