//! Transactions, receipts and logs.

use serde::{Deserialize, Serialize};

use crate::block::u256_bytes;
use crate::hash::blake2b_256;
use crate::{Address, Hash, U256};

/// A signed transaction.
///
/// The sender is carried explicitly; signature recovery is the transaction
/// pool's concern and happens before a transaction reaches this type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub nonce: u64,
    pub gas_price: U256,
    pub gas: u64,
    pub to: Option<Address>,
    pub value: U256,
    pub input: Vec<u8>,
    pub from: Address,
}

impl Transaction {
    pub fn hash(&self) -> Hash {
        let to = self.to.map(|a| *a.as_bytes()).unwrap_or_default();
        Hash::new(blake2b_256(&[
            &self.nonce.to_be_bytes(),
            &u256_bytes(&self.gas_price),
            &self.gas.to_be_bytes(),
            &[self.to.is_some() as u8],
            &to,
            &u256_bytes(&self.value),
            &self.input,
            self.from.as_bytes(),
        ]))
    }

    /// Upper bound on what the transaction can cost its sender.
    pub fn cost(&self) -> U256 {
        self.gas_price
            .saturating_mul(U256::from(self.gas))
            .saturating_add(self.value)
    }
}

/// A log entry emitted during transaction execution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Log {
    pub address: Address,
    pub topics: Vec<Hash>,
    pub data: Vec<u8>,
    pub block_number: u64,
    pub tx_hash: Hash,
    pub tx_index: u32,
    pub block_hash: Hash,
    pub index: u32,
    /// Set when the log was reverted by a chain reorganisation.
    pub removed: bool,
}

/// The outcome of executing one transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Receipt {
    pub status: u64,
    pub cumulative_gas_used: u64,
    pub gas_used: u64,
    pub tx_hash: Hash,
    pub contract_address: Option<Address>,
    pub logs: Vec<Log>,
}
