//! Block headers and blocks.

use serde::{Deserialize, Serialize};

use crate::hash::blake2b_256;
use crate::transaction::Transaction;
use crate::{Address, Hash, U256};

/// Big-endian encoding of a `U256`, used when hashing.
pub(crate) fn u256_bytes(value: &U256) -> [u8; 32] {
    let mut out = [0u8; 32];
    value.to_big_endian(&mut out);
    out
}

/// A block header.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub parent_hash: Hash,
    pub uncle_hash: Hash,
    pub coinbase: Address,
    pub root: Hash,
    pub tx_hash: Hash,
    pub receipt_hash: Hash,
    pub bloom: Vec<u8>,
    pub difficulty: U256,
    pub number: u64,
    pub gas_limit: u64,
    pub gas_used: u64,
    pub time: u64,
    pub extra: Vec<u8>,
    pub mix_digest: Hash,
    pub nonce: u64,
}

impl Default for Header {
    fn default() -> Self {
        Self {
            parent_hash: Hash::ZERO,
            uncle_hash: Hash::ZERO,
            coinbase: Address::ZERO,
            root: Hash::ZERO,
            tx_hash: Hash::ZERO,
            receipt_hash: Hash::ZERO,
            bloom: Vec::new(),
            difficulty: U256::zero(),
            number: 0,
            gas_limit: 0,
            gas_used: 0,
            time: 0,
            extra: Vec::new(),
            mix_digest: Hash::ZERO,
            nonce: 0,
        }
    }
}

impl Header {
    /// The header hash, covering every field including the seal.
    pub fn hash(&self) -> Hash {
        self.hash_with(&self.extra, &self.mix_digest, self.nonce)
    }

    /// Hash the header with the given seal-related fields substituted.
    ///
    /// Consensus engines use this to compute the hash a seal commits to.
    pub fn hash_with(&self, extra: &[u8], mix_digest: &Hash, nonce: u64) -> Hash {
        let difficulty = u256_bytes(&self.difficulty);
        Hash::new(blake2b_256(&[
            self.parent_hash.as_bytes(),
            self.uncle_hash.as_bytes(),
            self.coinbase.as_bytes(),
            self.root.as_bytes(),
            self.tx_hash.as_bytes(),
            self.receipt_hash.as_bytes(),
            &(self.bloom.len() as u64).to_be_bytes(),
            &self.bloom,
            &difficulty,
            &self.number.to_be_bytes(),
            &self.gas_limit.to_be_bytes(),
            &self.gas_used.to_be_bytes(),
            &self.time.to_be_bytes(),
            &(extra.len() as u64).to_be_bytes(),
            extra,
            mix_digest.as_bytes(),
            &nonce.to_be_bytes(),
        ]))
    }
}

/// A full block: header, transactions and uncle headers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Block {
    pub header: Header,
    pub transactions: Vec<Transaction>,
    pub uncles: Vec<Header>,
}

impl Block {
    pub fn new(header: Header, transactions: Vec<Transaction>) -> Self {
        Self {
            header,
            transactions,
            uncles: Vec::new(),
        }
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn hash(&self) -> Hash {
        self.header.hash()
    }

    pub fn number(&self) -> u64 {
        self.header.number
    }

    pub fn parent_hash(&self) -> Hash {
        self.header.parent_hash
    }

    pub fn root(&self) -> Hash {
        self.header.root
    }

    pub fn coinbase(&self) -> Address {
        self.header.coinbase
    }

    /// Replace the header with a sealed version, keeping the body.
    pub fn with_seal(self, header: Header) -> Self {
        Self { header, ..self }
    }
}
