//! The transaction pool contract and its configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use huc_types::{Address, Hash, Transaction, U256};
use serde::{Deserialize, Serialize};

use crate::event::{Subscription, TxPreEvent};
use crate::TxPoolError;

/// Transactions grouped by sender, each group in nonce order.
pub type PoolContent = BTreeMap<Address, Vec<Transaction>>;

/// Pool admission and sizing limits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxPoolConfig {
    /// Treat local transactions like remote ones.
    #[serde(default)]
    pub no_locals: bool,
    /// Journal of local transactions, relative to the data directory.
    #[serde(default = "default_journal")]
    pub journal: Option<PathBuf>,
    #[serde(default = "default_rejournal_secs")]
    pub rejournal_secs: u64,
    /// Minimum gas price for acceptance.
    #[serde(default = "default_price_limit")]
    pub price_limit: u64,
    /// Percentage bump required to replace a pending transaction.
    #[serde(default = "default_price_bump")]
    pub price_bump: u64,
    #[serde(default = "default_account_slots")]
    pub account_slots: u64,
    #[serde(default = "default_global_slots")]
    pub global_slots: u64,
    #[serde(default = "default_account_queue")]
    pub account_queue: u64,
    #[serde(default = "default_global_queue")]
    pub global_queue: u64,
    #[serde(default = "default_lifetime_secs")]
    pub lifetime_secs: u64,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_journal() -> Option<PathBuf> {
    Some(PathBuf::from("transactions.rlp"))
}
fn default_rejournal_secs() -> u64 {
    3600
}
fn default_price_limit() -> u64 {
    1
}
fn default_price_bump() -> u64 {
    10
}
fn default_account_slots() -> u64 {
    16
}
fn default_global_slots() -> u64 {
    4096
}
fn default_account_queue() -> u64 {
    64
}
fn default_global_queue() -> u64 {
    1024
}
fn default_lifetime_secs() -> u64 {
    3 * 3600
}

impl Default for TxPoolConfig {
    fn default() -> Self {
        Self {
            no_locals: false,
            journal: default_journal(),
            rejournal_secs: default_rejournal_secs(),
            price_limit: default_price_limit(),
            price_bump: default_price_bump(),
            account_slots: default_account_slots(),
            global_slots: default_global_slots(),
            account_queue: default_account_queue(),
            global_queue: default_global_queue(),
            lifetime_secs: default_lifetime_secs(),
        }
    }
}

impl TxPoolConfig {
    /// Copy of the config with a relative journal path anchored at `data_dir`.
    pub fn resolve_journal(&self, data_dir: Option<&Path>) -> Self {
        let journal = match (&self.journal, data_dir) {
            (Some(path), Some(dir)) if path.is_relative() => Some(dir.join(path)),
            (journal, _) => journal.clone(),
        };
        Self {
            journal,
            ..self.clone()
        }
    }
}

/// Admission, lookup and events for unconfirmed transactions.
pub trait TxPool: Send + Sync {
    /// Admit a transaction submitted through this node.
    fn add_local(&self, tx: Transaction) -> Result<(), TxPoolError>;

    /// Processable transactions by sender.
    fn pending(&self) -> Result<PoolContent, TxPoolError>;

    fn get(&self, hash: &Hash) -> Option<Transaction>;

    /// Next nonce for `address`, counting pending pool transactions.
    fn nonce(&self, address: &Address) -> u64;

    /// `(pending, queued)` transaction counts.
    fn stats(&self) -> (usize, usize);

    /// `(pending, queued)` transactions by sender.
    fn content(&self) -> (PoolContent, PoolContent);

    fn subscribe_tx_pre_event(&self) -> Subscription<TxPreEvent>;

    /// Raise or lower the minimum gas price for remote admission.
    fn set_gas_price(&self, price: U256);

    fn stop(&self);
}
