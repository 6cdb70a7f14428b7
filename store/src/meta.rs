//! Database metadata: schema version and chain configuration.

use huc_types::{ChainConfig, Hash};

use crate::schema::{config_key, DATABASE_VERSION_KEY};
use crate::{decode, encode, Database, StoreError};

/// The chain database layout this code reads and writes.
pub const BLOCKCHAIN_VERSION: u32 = 3;

/// The stored schema version, or `None` on a fresh database.
pub fn read_database_version(db: &dyn Database) -> Result<Option<u32>, StoreError> {
    match db.get(DATABASE_VERSION_KEY)? {
        None => Ok(None),
        Some(bytes) => {
            let arr: [u8; 4] = bytes.as_slice().try_into().map_err(|_| {
                StoreError::Corruption("database version has unexpected byte length".into())
            })?;
            Ok(Some(u32::from_be_bytes(arr)))
        }
    }
}

pub fn write_database_version(db: &dyn Database, version: u32) -> Result<(), StoreError> {
    db.put(DATABASE_VERSION_KEY, &version.to_be_bytes())
}

/// The chain configuration stored for a genesis block.
pub fn read_chain_config(db: &dyn Database, genesis: &Hash) -> Result<Option<ChainConfig>, StoreError> {
    db.get(&config_key(genesis))?
        .map(|bytes| decode(&bytes))
        .transpose()
}

pub fn write_chain_config(db: &dyn Database, genesis: &Hash, config: &ChainConfig) -> Result<(), StoreError> {
    db.put(&config_key(genesis), &encode(config)?)
}
