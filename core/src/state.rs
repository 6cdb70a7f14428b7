//! Account state snapshots.
//!
//! A snapshot is the full account map at one state root. The chain stores
//! one snapshot per block root; the miner keeps an uncommitted one for its
//! pending block.

use std::collections::BTreeMap;

use huc_store::state::{read_state_snapshot, write_state_snapshot};
use huc_store::{Database, StoreError};
use huc_types::{blake2b_256, Address, Hash, U256};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
    pub balance: U256,
    pub nonce: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateDb {
    accounts: BTreeMap<Address, AccountState>,
}

impl StateDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_balance(&self, address: &Address) -> U256 {
        self.accounts
            .get(address)
            .map(|a| a.balance)
            .unwrap_or_default()
    }

    pub fn set_balance(&mut self, address: Address, balance: U256) {
        self.accounts.entry(address).or_default().balance = balance;
    }

    pub fn add_balance(&mut self, address: Address, amount: U256) {
        let account = self.accounts.entry(address).or_default();
        account.balance = account.balance.saturating_add(amount);
    }

    /// Subtract `amount`, returning `false` (and changing nothing) if the
    /// balance is too small.
    pub fn sub_balance(&mut self, address: Address, amount: U256) -> bool {
        let account = self.accounts.entry(address).or_default();
        match account.balance.checked_sub(amount) {
            Some(rest) => {
                account.balance = rest;
                true
            }
            None => false,
        }
    }

    pub fn get_nonce(&self, address: &Address) -> u64 {
        self.accounts.get(address).map(|a| a.nonce).unwrap_or(0)
    }

    pub fn set_nonce(&mut self, address: Address, nonce: u64) {
        self.accounts.entry(address).or_default().nonce = nonce;
    }

    pub fn exists(&self, address: &Address) -> bool {
        self.accounts.contains_key(address)
    }

    pub fn accounts(&self) -> impl Iterator<Item = (&Address, &AccountState)> {
        self.accounts.iter()
    }

    /// Commitment over every account, in address order.
    pub fn root(&self) -> Hash {
        let mut encoded = Vec::with_capacity(self.accounts.len() * 60);
        for (address, account) in &self.accounts {
            let mut balance = [0u8; 32];
            account.balance.to_big_endian(&mut balance);
            encoded.extend_from_slice(address.as_bytes());
            encoded.extend_from_slice(&balance);
            encoded.extend_from_slice(&account.nonce.to_be_bytes());
        }
        Hash::new(blake2b_256(&[b"state", &encoded]))
    }

    /// Load the snapshot stored for `root`.
    pub fn load(db: &dyn Database, root: &Hash) -> Result<Option<Self>, StoreError> {
        read_state_snapshot(db, root)
    }

    /// Persist the snapshot and return its root.
    pub fn commit(&self, db: &dyn Database) -> Result<Hash, StoreError> {
        let root = self.root();
        write_state_snapshot(db, &root, self)?;
        Ok(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_changes_with_content() {
        let mut state = StateDb::new();
        let empty = state.root();
        state.set_balance(Address::new([1; 20]), U256::from(5u64));
        assert_ne!(state.root(), empty);
    }

    #[test]
    fn sub_balance_refuses_overdraft() {
        let mut state = StateDb::new();
        let addr = Address::new([2; 20]);
        state.set_balance(addr, U256::from(10u64));
        assert!(!state.sub_balance(addr, U256::from(11u64)));
        assert_eq!(state.get_balance(&addr), U256::from(10u64));
        assert!(state.sub_balance(addr, U256::from(4u64)));
        assert_eq!(state.get_balance(&addr), U256::from(6u64));
    }

    #[test]
    fn unknown_account_reads_as_empty() {
        let state = StateDb::new();
        let addr = Address::new([3; 20]);
        assert_eq!(state.get_balance(&addr), U256::zero());
        assert_eq!(state.get_nonce(&addr), 0);
        assert!(!state.exists(&addr));
    }
}
