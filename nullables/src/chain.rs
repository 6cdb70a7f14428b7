//! Nullable chain — a canonical chain kept entirely in a database.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use huc_consensus::{ChainReader, ConsensusEngine};
use huc_core::{
    BlockChain, CacheConfig, ChainError, ChainEvent, ChainHeadEvent, ChainSideEvent, Feed,
    RemovedLogsEvent, StateDb, Subscription, VmConfig,
};
use huc_store::chain::{
    delete_canonical_hash, read_block, read_canonical_hash, read_head_block_hash,
    read_header, read_header_number, read_td, write_block, write_canonical_hash,
    write_head_block_hash, write_td,
};
use huc_store::{Database, StoreError};
use huc_types::{Block, ChainConfig, Hash, Header, Log, U256};
use parking_lot::Mutex;

use crate::CallJournal;

/// A chain that stores every block, header and state snapshot in its
/// database and records the rewinds asked of it.
pub struct NullChain {
    db: Arc<dyn Database>,
    config: ChainConfig,
    engine: ConsensusEngine,
    cache: CacheConfig,
    vm: VmConfig,
    rewinds: Mutex<Vec<u64>>,
    stopped: AtomicBool,
    chain_feed: Feed<ChainEvent>,
    head_feed: Feed<ChainHeadEvent>,
    side_feed: Feed<ChainSideEvent>,
    logs_feed: Feed<Vec<Log>>,
    removed_logs_feed: Feed<RemovedLogsEvent>,
    journal: CallJournal,
}

impl NullChain {
    /// Open the chain stored in `db`. A genesis block must already be there.
    pub fn new(
        db: Arc<dyn Database>,
        config: ChainConfig,
        engine: ConsensusEngine,
        cache: CacheConfig,
        vm: VmConfig,
    ) -> Result<Self, ChainError> {
        if read_canonical_hash(db.as_ref(), 0)?.is_none() {
            return Err(ChainError::NoHead);
        }
        Ok(Self {
            db,
            config,
            engine,
            cache,
            vm,
            rewinds: Mutex::new(Vec::new()),
            stopped: AtomicBool::new(false),
            chain_feed: Feed::default(),
            head_feed: Feed::default(),
            side_feed: Feed::default(),
            logs_feed: Feed::default(),
            removed_logs_feed: Feed::default(),
            journal: CallJournal::default(),
        })
    }

    pub fn with_journal(mut self, journal: CallJournal) -> Self {
        self.journal = journal;
        self
    }

    pub fn cache_config(&self) -> &CacheConfig {
        &self.cache
    }

    pub fn vm_config(&self) -> &VmConfig {
        &self.vm
    }

    /// Every height passed to `set_head`, in call order.
    pub fn rewinds(&self) -> Vec<u64> {
        self.rewinds.lock().clone()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    pub fn head_number(&self) -> Result<u64, ChainError> {
        let hash = read_head_block_hash(self.db.as_ref())?.ok_or(ChainError::NoHead)?;
        read_header_number(self.db.as_ref(), &hash)?.ok_or(ChainError::NoHead)
    }

    /// Append a block on top of the head with the given post-state, making it
    /// canonical and announcing it.
    pub fn insert_block(&self, block: Block, state: &StateDb) -> Result<(), ChainError> {
        let parent = self.current_block()?;
        if block.parent_hash() != parent.hash() || block.number() != parent.number() + 1 {
            return Err(ChainError::UnknownBlock(block.parent_hash()));
        }
        let db = self.db.as_ref();
        let hash = block.hash();
        let parent_td = read_td(db, &parent.hash(), parent.number())?.unwrap_or_default();
        state.commit(db)?;
        write_td(db, &hash, block.number(), &(parent_td + block.header.difficulty))?;
        write_block(db, &block)?;
        write_canonical_hash(db, &hash, block.number())?;
        write_head_block_hash(db, &hash)?;

        self.chain_feed.send(ChainEvent {
            block: block.clone(),
            hash,
            logs: Vec::new(),
        });
        self.head_feed.send(ChainHeadEvent { block });
        Ok(())
    }

    /// Extend the chain with `count` empty blocks, each crediting `reward` to
    /// a fixed coinbase so that every block has a distinct state.
    pub fn extend(&self, count: u64) -> Result<(), ChainError> {
        for _ in 0..count {
            let parent = self.current_block()?;
            let mut state = self.state_at(&parent.root())?;
            let coinbase = parent.coinbase();
            state.add_balance(coinbase, U256::one());
            let header = Header {
                parent_hash: parent.hash(),
                number: parent.number() + 1,
                time: parent.header.time + 1,
                difficulty: parent.header.difficulty,
                gas_limit: parent.header.gas_limit,
                coinbase,
                root: state.root(),
                ..Header::default()
            };
            self.insert_block(Block::new(header, Vec::new()), &state)?;
        }
        Ok(())
    }

    fn canonical_header(&self, number: u64) -> Result<Option<Header>, StoreError> {
        match read_canonical_hash(self.db.as_ref(), number)? {
            Some(hash) => read_header(self.db.as_ref(), &hash, number),
            None => Ok(None),
        }
    }
}

impl ChainReader for NullChain {
    fn config(&self) -> ChainConfig {
        self.config.clone()
    }

    fn current_header(&self) -> Result<Option<Header>, StoreError> {
        match read_head_block_hash(self.db.as_ref())? {
            Some(hash) => self.header_by_hash(&hash),
            None => Ok(None),
        }
    }

    fn header(&self, hash: &Hash, number: u64) -> Result<Option<Header>, StoreError> {
        read_header(self.db.as_ref(), hash, number)
    }

    fn header_by_number(&self, number: u64) -> Result<Option<Header>, StoreError> {
        self.canonical_header(number)
    }

    fn header_by_hash(&self, hash: &Hash) -> Result<Option<Header>, StoreError> {
        match read_header_number(self.db.as_ref(), hash)? {
            Some(number) => read_header(self.db.as_ref(), hash, number),
            None => Ok(None),
        }
    }
}

impl BlockChain for NullChain {
    fn current_block(&self) -> Result<Block, ChainError> {
        let hash = read_head_block_hash(self.db.as_ref())?.ok_or(ChainError::NoHead)?;
        self.block_by_hash(&hash)?.ok_or(ChainError::UnknownBlock(hash))
    }

    fn block_by_number(&self, number: u64) -> Result<Option<Block>, ChainError> {
        match read_canonical_hash(self.db.as_ref(), number)? {
            Some(hash) => Ok(read_block(self.db.as_ref(), &hash, number)?),
            None => Ok(None),
        }
    }

    fn block_by_hash(&self, hash: &Hash) -> Result<Option<Block>, ChainError> {
        match read_header_number(self.db.as_ref(), hash)? {
            Some(number) => Ok(read_block(self.db.as_ref(), hash, number)?),
            None => Ok(None),
        }
    }

    fn state_at(&self, root: &Hash) -> Result<StateDb, ChainError> {
        StateDb::load(self.db.as_ref(), root)?.ok_or(ChainError::MissingState(*root))
    }

    fn set_head(&self, number: u64) -> Result<(), ChainError> {
        self.rewinds.lock().push(number);
        let head = self.head_number()?;
        let db = self.db.as_ref();
        for n in (number + 1..=head).rev() {
            delete_canonical_hash(db, n)?;
        }
        let target = read_canonical_hash(db, number)?.ok_or(ChainError::NoHead)?;
        write_head_block_hash(db, &target)?;
        tracing::warn!(from = head, to = number, "chain rewound");
        Ok(())
    }

    fn td_by_hash(&self, hash: &Hash) -> Result<Option<U256>, ChainError> {
        match read_header_number(self.db.as_ref(), hash)? {
            Some(number) => Ok(read_td(self.db.as_ref(), hash, number)?),
            None => Ok(None),
        }
    }

    fn engine(&self) -> &ConsensusEngine {
        &self.engine
    }

    fn reset_with_genesis_block(&self, genesis: Block) -> Result<(), ChainError> {
        let db = self.db.as_ref();
        let head = self.head_number()?;
        for n in (1..=head).rev() {
            delete_canonical_hash(db, n)?;
        }
        let hash = genesis.hash();
        write_td(db, &hash, 0, &genesis.header.difficulty)?;
        write_block(db, &genesis)?;
        write_canonical_hash(db, &hash, 0)?;
        write_head_block_hash(db, &hash)?;
        Ok(())
    }

    fn subscribe_chain_event(&self) -> Subscription<ChainEvent> {
        self.chain_feed.subscribe()
    }

    fn subscribe_chain_head_event(&self) -> Subscription<ChainHeadEvent> {
        self.head_feed.subscribe()
    }

    fn subscribe_chain_side_event(&self) -> Subscription<ChainSideEvent> {
        self.side_feed.subscribe()
    }

    fn subscribe_logs_event(&self) -> Subscription<Vec<Log>> {
        self.logs_feed.subscribe()
    }

    fn subscribe_removed_logs_event(&self) -> Subscription<RemovedLogsEvent> {
        self.removed_logs_feed.subscribe()
    }

    fn stop(&self) {
        if !self.stopped.swap(true, Ordering::AcqRel) {
            self.journal.record("blockchain stopped");
            tracing::info!("Blockchain manager stopped");
        }
    }
}
