//! Account manager: the wallets this node can sign with.

use std::sync::Arc;

use huc_types::{Address, Hash, SignedHash};
use parking_lot::RwLock;

use crate::AccountError;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Account {
    pub address: Address,
    /// Location of the backing key (keystore file, device path).
    pub url: String,
}

impl Account {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            url: String::new(),
        }
    }
}

/// A source of accounts that can sign.
pub trait Wallet: Send + Sync {
    fn url(&self) -> String;

    fn accounts(&self) -> Vec<Account>;

    fn contains(&self, account: &Account) -> bool {
        self.accounts().iter().any(|a| a.address == account.address)
    }

    fn sign_hash(&self, account: &Account, hash: &Hash) -> Result<SignedHash, AccountError>;
}

/// Ordered collection of wallets.
#[derive(Default)]
pub struct Manager {
    wallets: RwLock<Vec<Arc<dyn Wallet>>>,
}

impl Manager {
    pub fn new(wallets: Vec<Arc<dyn Wallet>>) -> Self {
        Self {
            wallets: RwLock::new(wallets),
        }
    }

    /// All wallets, in registration order.
    pub fn wallets(&self) -> Vec<Arc<dyn Wallet>> {
        self.wallets.read().clone()
    }

    pub fn add_wallet(&self, wallet: Arc<dyn Wallet>) {
        tracing::debug!(url = %wallet.url(), "wallet registered");
        self.wallets.write().push(wallet);
    }

    /// The wallet holding `account`.
    pub fn find(&self, account: &Account) -> Result<Arc<dyn Wallet>, AccountError> {
        self.wallets
            .read()
            .iter()
            .find(|w| w.contains(account))
            .cloned()
            .ok_or(AccountError::UnknownAccount(account.address))
    }

    /// Every account of every wallet.
    pub fn accounts(&self) -> Vec<Address> {
        self.wallets
            .read()
            .iter()
            .flat_map(|w| w.accounts())
            .map(|a| a.address)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use huc_types::{PublicKey, Signature};

    struct FixedWallet(Vec<Address>);

    impl Wallet for FixedWallet {
        fn url(&self) -> String {
            "fixed://".into()
        }

        fn accounts(&self) -> Vec<Account> {
            self.0.iter().copied().map(Account::new).collect()
        }

        fn sign_hash(&self, _account: &Account, _hash: &Hash) -> Result<SignedHash, AccountError> {
            Ok(SignedHash {
                public_key: PublicKey([0; 32]),
                signature: Signature([0; 64]),
            })
        }
    }

    #[test]
    fn find_locates_owning_wallet() {
        let a = Address::new([1; 20]);
        let b = Address::new([2; 20]);
        let manager = Manager::new(vec![Arc::new(FixedWallet(vec![a])), Arc::new(FixedWallet(vec![b]))]);
        let wallet = manager.find(&Account::new(b)).unwrap();
        assert_eq!(wallet.accounts()[0].address, b);
        assert_eq!(manager.accounts(), vec![a, b]);
    }

    #[test]
    fn find_unknown_account_fails() {
        let manager = Manager::default();
        let missing = Address::new([9; 20]);
        assert!(matches!(
            manager.find(&Account::new(missing)),
            Err(AccountError::UnknownAccount(addr)) if addr == missing
        ));
    }
}
