//! Nullable miner — a pending block one above the head, no real sealing.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use huc_core::{BlockChain, Miner, MinerError, StateDb, TxPool};
use huc_types::params::MAXIMUM_EXTRA_DATA_SIZE;
use huc_types::{Address, Block, Header, U256};
use parking_lot::Mutex;

use crate::CallJournal;

/// Builds its pending block from the chain head plus the pool's pending
/// transactions, crediting the engine's block reward to the coinbase so the
/// pending state always differs from the head state.
pub struct NullMiner {
    chain: Arc<dyn BlockChain>,
    tx_pool: Arc<dyn TxPool>,
    mining: AtomicBool,
    coinbase: Mutex<Address>,
    extra: Mutex<Vec<u8>>,
    starts: AtomicUsize,
    stops: AtomicUsize,
    journal: CallJournal,
}

impl NullMiner {
    pub fn new(chain: Arc<dyn BlockChain>, tx_pool: Arc<dyn TxPool>) -> Self {
        Self {
            chain,
            tx_pool,
            mining: AtomicBool::new(false),
            coinbase: Mutex::new(Address::ZERO),
            extra: Mutex::new(Vec::new()),
            starts: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
            journal: CallJournal::default(),
        }
    }

    pub fn with_journal(mut self, journal: CallJournal) -> Self {
        self.journal = journal;
        self
    }

    pub fn coinbase(&self) -> Address {
        *self.coinbase.lock()
    }

    pub fn extra(&self) -> Vec<u8> {
        self.extra.lock().clone()
    }

    /// Number of `start` calls so far.
    pub fn start_count(&self) -> usize {
        self.starts.load(Ordering::Acquire)
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::Acquire)
    }

    fn build_pending(&self) -> Result<(Block, StateDb), MinerError> {
        let parent = self.chain.current_block()?;
        let mut state = self.chain.state_at(&parent.root())?;
        let coinbase = self.coinbase();
        let mut header = Header {
            parent_hash: parent.hash(),
            number: parent.number() + 1,
            time: parent.header.time + 1,
            difficulty: parent.header.difficulty,
            gas_limit: parent.header.gas_limit,
            coinbase,
            extra: self.extra(),
            ..Header::default()
        };
        let reward = self
            .chain
            .engine()
            .engine()
            .block_reward(&self.chain.config(), &header);
        state.add_balance(coinbase, reward.max(U256::one()));

        let transactions: Vec<_> = self.tx_pool.pending()?.into_values().flatten().collect();
        header.root = state.root();
        Ok((Block::new(header, transactions), state))
    }
}

impl Miner for NullMiner {
    fn start(&self, coinbase: Address) {
        *self.coinbase.lock() = coinbase;
        self.mining.store(true, Ordering::Release);
        self.starts.fetch_add(1, Ordering::AcqRel);
        tracing::info!(coinbase = %coinbase, "Starting mining operation");
    }

    fn stop(&self) {
        self.mining.store(false, Ordering::Release);
        self.stops.fetch_add(1, Ordering::AcqRel);
        self.journal.record("miner stopped");
    }

    fn is_mining(&self) -> bool {
        self.mining.load(Ordering::Acquire)
    }

    fn pending_block(&self) -> Result<Option<Block>, MinerError> {
        Ok(self.pending()?.map(|(block, _)| block))
    }

    fn pending(&self) -> Result<Option<(Block, StateDb)>, MinerError> {
        self.build_pending().map(Some)
    }

    fn set_coinbase(&self, coinbase: Address) {
        *self.coinbase.lock() = coinbase;
    }

    fn set_extra(&self, extra: Vec<u8>) -> Result<(), MinerError> {
        if extra.len() > MAXIMUM_EXTRA_DATA_SIZE {
            return Err(MinerError::ExtraTooLong {
                size: extra.len(),
                max: MAXIMUM_EXTRA_DATA_SIZE,
            });
        }
        *self.extra.lock() = extra;
        Ok(())
    }

    fn hashrate(&self) -> u64 {
        0
    }
}
