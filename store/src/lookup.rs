//! Transaction lookup entries.
//!
//! Older databases stored every transaction a second time next to its
//! location. The current layout keeps only the location; the node rewrites
//! legacy entries in the background (see the node's migration task).

use huc_types::{Hash, Transaction};
use serde::{Deserialize, Serialize};

use crate::schema::{legacy_tx_key, tx_lookup_key, DEDUP_COMPLETE_KEY, LEGACY_TX_PREFIX};
use crate::{decode, encode, Database, StoreError};

/// Where a transaction was included.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxLookupEntry {
    pub block_hash: Hash,
    pub block_number: u64,
    pub index: u64,
}

/// A pre-dedup entry: location plus a full copy of the transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyTxEntry {
    pub block_hash: Hash,
    pub block_number: u64,
    pub index: u64,
    pub transaction: Transaction,
}

pub fn read_tx_lookup_entry(db: &dyn Database, tx_hash: &Hash) -> Result<Option<TxLookupEntry>, StoreError> {
    db.get(&tx_lookup_key(tx_hash))?
        .map(|bytes| decode(&bytes))
        .transpose()
}

pub fn write_tx_lookup_entry(db: &dyn Database, tx_hash: &Hash, entry: &TxLookupEntry) -> Result<(), StoreError> {
    db.put(&tx_lookup_key(tx_hash), &encode(entry)?)
}

pub fn write_legacy_tx_entry(db: &dyn Database, entry: &LegacyTxEntry) -> Result<(), StoreError> {
    db.put(&legacy_tx_key(&entry.transaction.hash()), &encode(entry)?)
}

pub fn read_legacy_tx_entry(db: &dyn Database, tx_hash: &Hash) -> Result<Option<LegacyTxEntry>, StoreError> {
    db.get(&legacy_tx_key(tx_hash))?
        .map(|bytes| decode(&bytes))
        .transpose()
}

pub fn delete_legacy_tx_entry(db: &dyn Database, tx_hash: &Hash) -> Result<(), StoreError> {
    db.delete(&legacy_tx_key(tx_hash))
}

/// Hashes of every transaction still stored in the legacy layout.
pub fn legacy_tx_hashes(db: &dyn Database) -> Result<Vec<Hash>, StoreError> {
    db.keys_with_prefix(LEGACY_TX_PREFIX)?
        .into_iter()
        .map(|key| {
            Hash::from_slice(&key[LEGACY_TX_PREFIX.len()..])
                .map_err(|e| StoreError::Corruption(e.to_string()))
        })
        .collect()
}

pub fn is_dedup_complete(db: &dyn Database) -> Result<bool, StoreError> {
    db.has(DEDUP_COMPLETE_KEY)
}

pub fn mark_dedup_complete(db: &dyn Database) -> Result<(), StoreError> {
    db.put(DEDUP_COMPLETE_KEY, &[1])
}
