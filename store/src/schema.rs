//! Key layout of the chain database.
//!
//! Numbers are encoded big-endian so that prefix iteration visits them in
//! ascending order.

use huc_types::Hash;

pub const DATABASE_VERSION_KEY: &[u8] = b"DatabaseVersion";
pub const HEAD_BLOCK_KEY: &[u8] = b"LastBlock";
pub const DEDUP_COMPLETE_KEY: &[u8] = b"DedupUpgradeComplete";

pub const CONFIG_PREFIX: &[u8] = b"huc-config-";
pub const HEADER_PREFIX: &[u8] = b"h";
pub const HEADER_HASH_SUFFIX: &[u8] = b"n";
pub const HEADER_TD_SUFFIX: &[u8] = b"t";
pub const HEADER_NUMBER_PREFIX: &[u8] = b"H";
pub const BLOCK_PREFIX: &[u8] = b"b";
pub const RECEIPTS_PREFIX: &[u8] = b"r";
pub const STATE_PREFIX: &[u8] = b"s";
pub const BLOOM_BITS_PREFIX: &[u8] = b"B";
pub const LEGACY_TX_PREFIX: &[u8] = b"l";
pub const TX_LOOKUP_PREFIX: &[u8] = b"L";

fn join(parts: &[&[u8]]) -> Vec<u8> {
    let mut key = Vec::with_capacity(parts.iter().map(|p| p.len()).sum());
    for part in parts {
        key.extend_from_slice(part);
    }
    key
}

pub fn config_key(genesis: &Hash) -> Vec<u8> {
    join(&[CONFIG_PREFIX, genesis.as_bytes()])
}

/// `h` + number + `n` → canonical hash.
pub fn canonical_hash_key(number: u64) -> Vec<u8> {
    join(&[HEADER_PREFIX, &number.to_be_bytes(), HEADER_HASH_SUFFIX])
}

/// `h` + number + hash → header.
pub fn header_key(hash: &Hash, number: u64) -> Vec<u8> {
    join(&[HEADER_PREFIX, &number.to_be_bytes(), hash.as_bytes()])
}

/// `h` + number + hash + `t` → total difficulty.
pub fn td_key(hash: &Hash, number: u64) -> Vec<u8> {
    join(&[HEADER_PREFIX, &number.to_be_bytes(), hash.as_bytes(), HEADER_TD_SUFFIX])
}

/// `H` + hash → number.
pub fn header_number_key(hash: &Hash) -> Vec<u8> {
    join(&[HEADER_NUMBER_PREFIX, hash.as_bytes()])
}

pub fn block_key(hash: &Hash, number: u64) -> Vec<u8> {
    join(&[BLOCK_PREFIX, &number.to_be_bytes(), hash.as_bytes()])
}

pub fn receipts_key(hash: &Hash, number: u64) -> Vec<u8> {
    join(&[RECEIPTS_PREFIX, &number.to_be_bytes(), hash.as_bytes()])
}

pub fn state_key(root: &Hash) -> Vec<u8> {
    join(&[STATE_PREFIX, root.as_bytes()])
}

/// `B` + bit (u16) + section (u64) + section head hash → bit vector.
pub fn bloom_bits_key(bit: u32, section: u64, head: &Hash) -> Vec<u8> {
    join(&[
        BLOOM_BITS_PREFIX,
        &(bit as u16).to_be_bytes(),
        &section.to_be_bytes(),
        head.as_bytes(),
    ])
}

pub fn legacy_tx_key(tx_hash: &Hash) -> Vec<u8> {
    join(&[LEGACY_TX_PREFIX, tx_hash.as_bytes()])
}

pub fn tx_lookup_key(tx_hash: &Hash) -> Vec<u8> {
    join(&[TX_LOOKUP_PREFIX, tx_hash.as_bytes()])
}
