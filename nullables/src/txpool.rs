//! Nullable transaction pool.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use huc_core::{BlockChain, Feed, PoolContent, Subscription, TxPool, TxPoolConfig, TxPoolError, TxPreEvent};
use huc_types::{Address, Hash, Transaction, U256};
use parking_lot::Mutex;

use crate::CallJournal;

/// A pool with no eviction or pricing policy: transactions whose nonce is
/// next in line are pending, the rest are queued.
pub struct NullTxPool {
    config: TxPoolConfig,
    chain: Arc<dyn BlockChain>,
    pending: Mutex<PoolContent>,
    queued: Mutex<PoolContent>,
    feed: Feed<TxPreEvent>,
    gas_price: Mutex<U256>,
    stopped: AtomicBool,
    journal: CallJournal,
}

impl NullTxPool {
    pub fn new(config: TxPoolConfig, chain: Arc<dyn BlockChain>) -> Self {
        let gas_price = U256::from(config.price_limit);
        Self {
            config,
            chain,
            pending: Mutex::new(BTreeMap::new()),
            queued: Mutex::new(BTreeMap::new()),
            feed: Feed::default(),
            gas_price: Mutex::new(gas_price),
            stopped: AtomicBool::new(false),
            journal: CallJournal::default(),
        }
    }

    pub fn with_journal(mut self, journal: CallJournal) -> Self {
        self.journal = journal;
        self
    }

    pub fn config(&self) -> &TxPoolConfig {
        &self.config
    }

    /// The current minimum gas price.
    pub fn gas_price(&self) -> U256 {
        *self.gas_price.lock()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    fn state_nonce(&self, address: &Address) -> u64 {
        self.chain
            .current_block()
            .and_then(|head| self.chain.state_at(&head.root()))
            .map(|state| state.get_nonce(address))
            .unwrap_or(0)
    }

    fn known(&self, hash: &Hash) -> bool {
        self.get(hash).is_some()
    }
}

impl TxPool for NullTxPool {
    fn add_local(&self, tx: Transaction) -> Result<(), TxPoolError> {
        if self.is_stopped() {
            return Err(TxPoolError::Stopped);
        }
        let hash = tx.hash();
        if self.known(&hash) {
            return Err(TxPoolError::AlreadyKnown(hash));
        }
        if tx.nonce < self.state_nonce(&tx.from) {
            return Err(TxPoolError::NonceTooLow);
        }
        if tx.nonce == self.nonce(&tx.from) {
            self.pending.lock().entry(tx.from).or_default().push(tx.clone());
        } else {
            let mut queued = self.queued.lock();
            let list = queued.entry(tx.from).or_default();
            list.push(tx.clone());
            list.sort_by_key(|t| t.nonce);
        }
        tracing::debug!(hash = %hash, from = %tx.from, nonce = tx.nonce, "local transaction admitted");
        self.feed.send(TxPreEvent { tx });
        Ok(())
    }

    fn pending(&self) -> Result<PoolContent, TxPoolError> {
        Ok(self.pending.lock().clone())
    }

    fn get(&self, hash: &Hash) -> Option<Transaction> {
        let find = |content: &PoolContent| {
            content
                .values()
                .flatten()
                .find(|tx| tx.hash() == *hash)
                .cloned()
        };
        find(&*self.pending.lock()).or_else(|| find(&*self.queued.lock()))
    }

    fn nonce(&self, address: &Address) -> u64 {
        self.pending
            .lock()
            .get(address)
            .and_then(|txs| txs.last())
            .map(|tx| tx.nonce + 1)
            .unwrap_or_else(|| self.state_nonce(address))
    }

    fn stats(&self) -> (usize, usize) {
        let count = |content: &PoolContent| -> usize { content.values().map(Vec::len).sum() };
        (count(&*self.pending.lock()), count(&*self.queued.lock()))
    }

    fn content(&self) -> (PoolContent, PoolContent) {
        (self.pending.lock().clone(), self.queued.lock().clone())
    }

    fn subscribe_tx_pre_event(&self) -> Subscription<TxPreEvent> {
        self.feed.subscribe()
    }

    fn set_gas_price(&self, price: U256) {
        *self.gas_price.lock() = price;
        tracing::info!(price = %price, "Transaction pool price threshold updated");
    }

    fn stop(&self) {
        if !self.stopped.swap(true, Ordering::AcqRel) {
            self.journal.record("transaction pool stopped");
            tracing::info!("Transaction pool stopped");
        }
    }
}
