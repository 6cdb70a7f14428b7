//! Per-section bloom bit vectors produced by the bloom indexer.

use huc_types::Hash;

use crate::schema::bloom_bits_key;
use crate::{Database, StoreError};

/// The compressed bit vector of one bloom bit over one section, keyed by the
/// hash of the section's last canonical block.
pub fn read_bloom_bits(db: &dyn Database, bit: u32, section: u64, head: &Hash) -> Result<Option<Vec<u8>>, StoreError> {
    db.get(&bloom_bits_key(bit, section, head))
}

pub fn write_bloom_bits(db: &dyn Database, bit: u32, section: u64, head: &Hash, bits: &[u8]) -> Result<(), StoreError> {
    db.put(&bloom_bits_key(bit, section, head), bits)
}
