//! Headers, blocks, receipts and the canonical chain index.

use huc_types::{Block, Hash, Header, Receipt, U256};

use crate::schema::{
    block_key, canonical_hash_key, header_key, header_number_key, receipts_key, td_key,
    HEAD_BLOCK_KEY,
};
use crate::{decode, encode, Database, StoreError};

fn read_hash(bytes: &[u8]) -> Result<Hash, StoreError> {
    Hash::from_slice(bytes).map_err(|e| StoreError::Corruption(e.to_string()))
}

pub fn read_canonical_hash(db: &dyn Database, number: u64) -> Result<Option<Hash>, StoreError> {
    db.get(&canonical_hash_key(number))?
        .map(|bytes| read_hash(&bytes))
        .transpose()
}

pub fn write_canonical_hash(db: &dyn Database, hash: &Hash, number: u64) -> Result<(), StoreError> {
    db.put(&canonical_hash_key(number), hash.as_bytes())
}

pub fn delete_canonical_hash(db: &dyn Database, number: u64) -> Result<(), StoreError> {
    db.delete(&canonical_hash_key(number))
}

/// The height of a stored header, looked up by hash.
pub fn read_header_number(db: &dyn Database, hash: &Hash) -> Result<Option<u64>, StoreError> {
    match db.get(&header_number_key(hash))? {
        None => Ok(None),
        Some(bytes) => {
            let arr: [u8; 8] = bytes
                .as_slice()
                .try_into()
                .map_err(|_| StoreError::Corruption("header number has bad length".into()))?;
            Ok(Some(u64::from_be_bytes(arr)))
        }
    }
}

pub fn read_header(db: &dyn Database, hash: &Hash, number: u64) -> Result<Option<Header>, StoreError> {
    db.get(&header_key(hash, number))?
        .map(|bytes| decode(&bytes))
        .transpose()
}

/// Store a header together with its hash → number index.
pub fn write_header(db: &dyn Database, header: &Header) -> Result<(), StoreError> {
    let hash = header.hash();
    db.put(&header_number_key(&hash), &header.number.to_be_bytes())?;
    db.put(&header_key(&hash, header.number), &encode(header)?)
}

pub fn read_block(db: &dyn Database, hash: &Hash, number: u64) -> Result<Option<Block>, StoreError> {
    db.get(&block_key(hash, number))?
        .map(|bytes| decode(&bytes))
        .transpose()
}

/// Store a block and its header.
pub fn write_block(db: &dyn Database, block: &Block) -> Result<(), StoreError> {
    write_header(db, &block.header)?;
    db.put(&block_key(&block.hash(), block.number()), &encode(block)?)
}

pub fn read_td(db: &dyn Database, hash: &Hash, number: u64) -> Result<Option<U256>, StoreError> {
    match db.get(&td_key(hash, number))? {
        None => Ok(None),
        Some(bytes) if bytes.len() == 32 => Ok(Some(U256::from_big_endian(&bytes))),
        Some(_) => Err(StoreError::Corruption("total difficulty has bad length".into())),
    }
}

pub fn write_td(db: &dyn Database, hash: &Hash, number: u64, td: &U256) -> Result<(), StoreError> {
    let mut bytes = [0u8; 32];
    td.to_big_endian(&mut bytes);
    db.put(&td_key(hash, number), &bytes)
}

pub fn read_receipts(db: &dyn Database, hash: &Hash, number: u64) -> Result<Option<Vec<Receipt>>, StoreError> {
    db.get(&receipts_key(hash, number))?
        .map(|bytes| decode(&bytes))
        .transpose()
}

pub fn write_receipts(db: &dyn Database, hash: &Hash, number: u64, receipts: &[Receipt]) -> Result<(), StoreError> {
    db.put(&receipts_key(hash, number), &encode(&receipts)?)
}

pub fn read_head_block_hash(db: &dyn Database) -> Result<Option<Hash>, StoreError> {
    db.get(HEAD_BLOCK_KEY)?.map(|bytes| read_hash(&bytes)).transpose()
}

pub fn write_head_block_hash(db: &dyn Database, hash: &Hash) -> Result<(), StoreError> {
    db.put(HEAD_BLOCK_KEY, hash.as_bytes())
}

/// The canonical block at `number`, if any.
pub fn read_canonical_block(db: &dyn Database, number: u64) -> Result<Option<Block>, StoreError> {
    match read_canonical_hash(db, number)? {
        Some(hash) => read_block(db, &hash, number),
        None => Ok(None),
    }
}

/// Height of the current head block, if a head has been written.
pub fn read_head_number(db: &dyn Database) -> Result<Option<u64>, StoreError> {
    match read_head_block_hash(db)? {
        Some(hash) => read_header_number(db, &hash),
        None => Ok(None),
    }
}
