//! Nullable wallet — deterministic keys derived from seeds.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use huc_core::{Account, AccountError, Wallet};
use huc_crypto::{derive_address, keypair_from_seed, sign_hash};
use huc_types::{Address, Hash, SignedHash};

/// Holds seed-derived Ed25519 keys and counts how often it is queried.
pub struct NullWallet {
    url: String,
    seeds: Vec<[u8; 32]>,
    locked: AtomicBool,
    account_queries: AtomicUsize,
    signatures: AtomicUsize,
}

impl NullWallet {
    pub fn new(url: impl Into<String>, seeds: Vec<[u8; 32]>) -> Self {
        Self {
            url: url.into(),
            seeds,
            locked: AtomicBool::new(false),
            account_queries: AtomicUsize::new(0),
            signatures: AtomicUsize::new(0),
        }
    }

    /// A wallet with one account derived from `seed`.
    pub fn single(seed: [u8; 32]) -> Self {
        Self::new(format!("null://{}", seed[0]), vec![seed])
    }

    /// The address a seed produces.
    pub fn address_of(seed: &[u8; 32]) -> Address {
        derive_address(&keypair_from_seed(seed).public)
    }

    pub fn set_locked(&self, locked: bool) {
        self.locked.store(locked, Ordering::Release);
    }

    /// Number of `accounts` calls so far.
    pub fn account_queries(&self) -> usize {
        self.account_queries.load(Ordering::Acquire)
    }

    pub fn signatures(&self) -> usize {
        self.signatures.load(Ordering::Acquire)
    }

    fn addresses(&self) -> impl Iterator<Item = (Address, &[u8; 32])> {
        self.seeds.iter().map(|seed| (Self::address_of(seed), seed))
    }
}

impl Wallet for NullWallet {
    fn url(&self) -> String {
        self.url.clone()
    }

    fn accounts(&self) -> Vec<Account> {
        self.account_queries.fetch_add(1, Ordering::AcqRel);
        self.addresses()
            .map(|(address, _)| Account {
                address,
                url: self.url.clone(),
            })
            .collect()
    }

    fn contains(&self, account: &Account) -> bool {
        self.addresses().any(|(address, _)| address == account.address)
    }

    fn sign_hash(&self, account: &Account, hash: &Hash) -> Result<SignedHash, AccountError> {
        if self.locked.load(Ordering::Acquire) {
            return Err(AccountError::Locked(account.address));
        }
        let (_, seed) = self
            .addresses()
            .find(|(address, _)| *address == account.address)
            .ok_or(AccountError::UnknownAccount(account.address))?;
        self.signatures.fetch_add(1, Ordering::AcqRel);
        Ok(sign_hash(hash, &keypair_from_seed(seed).private))
    }
}
