//! The query backend behind the RPC services.
//!
//! Every block query takes a [`BlockRef`]. `Pending` is answered from the
//! miner's speculative block and state; `Latest` and `Numbered` only ever
//! see the canonical chain. After the node stops every query fails with
//! [`BackendError::Stopped`] instead of touching closed storage.

use std::sync::Arc;

use huc_consensus::ChainReader;
use huc_core::{
    BlockChain, ChainEvent, ChainHeadEvent, ChainSideEvent, EventMux, Evm, EvmContext, Manager,
    MatcherSession, Message, PoolContent, RemovedLogsEvent, StateDb, Subscription, SyncProgress,
    TxPreEvent, VmConfig,
};
use huc_store::chain::{read_header_number, read_receipts};
use huc_store::Database;
use huc_types::params::BLOOM_BITS_BLOCKS;
use huc_types::{Address, Block, BlockRef, ChainConfig, Hash, Header, Log, Receipt, Transaction, U256};

pub use crate::error::BackendError;

use crate::bloombits::FilterWorkers;
use crate::gasprice::Oracle;
use crate::node::NodeCore;

pub struct ApiBackend {
    node: Arc<NodeCore>,
    gpo: Oracle,
}

impl ApiBackend {
    pub fn new(node: Arc<NodeCore>, gpo: Oracle) -> Self {
        Self { node, gpo }
    }

    pub fn chain_config(&self) -> &ChainConfig {
        &self.node.chain_config
    }

    pub fn current_block(&self) -> Result<Block, BackendError> {
        self.node.ensure_running()?;
        let head = self.node.chain.current_block()?;
        self.node.metrics.chain_head.set(head.number() as i64);
        Ok(head)
    }

    /// Cancel any sync in flight, then rewind the chain to `number`.
    pub fn set_head(&self, number: u64) -> Result<(), BackendError> {
        self.node.ensure_running()?;
        self.node.protocol_manager.cancel_sync();
        self.node.chain.set_head(number)?;
        Ok(())
    }

    pub fn header_by_number(&self, block: BlockRef) -> Result<Option<Header>, BackendError> {
        self.node.ensure_running()?;
        match block {
            BlockRef::Pending => Ok(self.node.miner.pending_block()?.map(|b| b.header)),
            BlockRef::Latest => Ok(Some(self.current_block()?.header)),
            BlockRef::Numbered(number) => Ok(self.node.chain.header_by_number(number)?),
        }
    }

    pub fn block_by_number(&self, block: BlockRef) -> Result<Option<Block>, BackendError> {
        self.node.ensure_running()?;
        match block {
            BlockRef::Pending => Ok(self.node.miner.pending_block()?),
            BlockRef::Latest => Ok(Some(self.current_block()?)),
            BlockRef::Numbered(number) => Ok(self.node.chain.block_by_number(number)?),
        }
    }

    /// The state at `block` with its header. A canonical block whose state
    /// is gone is an error, not an empty state.
    pub fn state_and_header_by_number(
        &self,
        block: BlockRef,
    ) -> Result<Option<(StateDb, Header)>, BackendError> {
        self.node.ensure_running()?;
        if block.is_pending() {
            return Ok(self
                .node
                .miner
                .pending()?
                .map(|(block, state)| (state, block.header)));
        }
        let Some(header) = self.header_by_number(block)? else {
            return Ok(None);
        };
        let state = self.node.chain.state_at(&header.root)?;
        Ok(Some((state, header)))
    }

    /// An EVM for simulating `msg`. The sender's balance is raised to the
    /// maximum so the call never fails for lack of funds; the state is a
    /// throwaway copy.
    pub fn evm(
        &self,
        msg: &Message,
        mut state: StateDb,
        header: &Header,
        config: Option<VmConfig>,
    ) -> Result<Evm, BackendError> {
        self.node.ensure_running()?;
        state.set_balance(msg.from, U256::MAX);
        let context = EvmContext::new(msg, header, self.node.chain.clone(), None);
        Ok(Evm::new(
            context,
            state,
            config.unwrap_or_else(|| self.node.vm_config.clone()),
        ))
    }

    pub fn block_by_hash(&self, hash: &Hash) -> Result<Option<Block>, BackendError> {
        self.node.ensure_running()?;
        Ok(self.node.chain.block_by_hash(hash)?)
    }

    pub fn receipts(&self, hash: &Hash) -> Result<Option<Vec<Receipt>>, BackendError> {
        self.node.ensure_running()?;
        let db = self.node.chain_db.as_ref();
        let Some(number) = read_header_number(db, hash)? else {
            return Ok(None);
        };
        Ok(read_receipts(db, hash, number)?)
    }

    /// Logs of the block, grouped per transaction.
    pub fn logs(&self, hash: &Hash) -> Result<Option<Vec<Vec<Log>>>, BackendError> {
        Ok(self
            .receipts(hash)?
            .map(|receipts| receipts.into_iter().map(|r| r.logs).collect()))
    }

    pub fn td(&self, hash: &Hash) -> Result<Option<U256>, BackendError> {
        self.node.ensure_running()?;
        Ok(self.node.chain.td_by_hash(hash)?)
    }

    // ── Subscriptions ───────────────────────────────────────────────────

    pub fn subscribe_removed_logs_event(&self) -> Subscription<RemovedLogsEvent> {
        self.subscribe(|chain| chain.subscribe_removed_logs_event())
    }

    pub fn subscribe_chain_event(&self) -> Subscription<ChainEvent> {
        self.subscribe(|chain| chain.subscribe_chain_event())
    }

    pub fn subscribe_chain_head_event(&self) -> Subscription<ChainHeadEvent> {
        self.subscribe(|chain| chain.subscribe_chain_head_event())
    }

    pub fn subscribe_chain_side_event(&self) -> Subscription<ChainSideEvent> {
        self.subscribe(|chain| chain.subscribe_chain_side_event())
    }

    pub fn subscribe_logs_event(&self) -> Subscription<Vec<Log>> {
        self.subscribe(|chain| chain.subscribe_logs_event())
    }

    pub fn subscribe_tx_pre_event(&self) -> Subscription<TxPreEvent> {
        if self.node.is_stopped() {
            return Subscription::closed();
        }
        self.node.tx_pool.subscribe_tx_pre_event()
    }

    fn subscribe<T: Clone>(
        &self,
        f: impl FnOnce(&dyn BlockChain) -> Subscription<T>,
    ) -> Subscription<T> {
        if self.node.is_stopped() {
            return Subscription::closed();
        }
        f(self.node.chain.as_ref())
    }

    // ── Transaction pool ────────────────────────────────────────────────

    pub fn send_tx(&self, tx: Transaction) -> Result<(), BackendError> {
        self.node.ensure_running()?;
        let hash = tx.hash();
        self.node.tx_pool.add_local(tx)?;
        self.node.metrics.transactions_submitted.inc();
        tracing::debug!(tx = %hash, "transaction submitted");
        Ok(())
    }

    /// Every processable pool transaction.
    pub fn pool_transactions(&self) -> Result<Vec<Transaction>, BackendError> {
        self.node.ensure_running()?;
        let pending = self.node.tx_pool.pending()?;
        Ok(pending.into_values().flatten().collect())
    }

    pub fn pool_transaction(&self, hash: &Hash) -> Result<Option<Transaction>, BackendError> {
        self.node.ensure_running()?;
        Ok(self.node.tx_pool.get(hash))
    }

    /// Next nonce for `address`, counting transactions still in the pool.
    pub fn pool_nonce(&self, address: &Address) -> Result<u64, BackendError> {
        self.node.ensure_running()?;
        Ok(self.node.tx_pool.nonce(address))
    }

    /// `(pending, queued)` counts.
    pub fn stats(&self) -> Result<(usize, usize), BackendError> {
        self.node.ensure_running()?;
        Ok(self.node.tx_pool.stats())
    }

    pub fn tx_pool_content(&self) -> Result<(PoolContent, PoolContent), BackendError> {
        self.node.ensure_running()?;
        Ok(self.node.tx_pool.content())
    }

    // ── Network and meta ────────────────────────────────────────────────

    pub fn sync_progress(&self) -> SyncProgress {
        self.node.protocol_manager.sync_progress()
    }

    pub fn protocol_version(&self) -> u32 {
        self.node.protocol_version()
    }

    pub fn suggest_price(&self) -> Result<U256, BackendError> {
        self.node.ensure_running()?;
        Ok(self.gpo.suggest_price()?)
    }

    pub fn chain_db(&self) -> &Arc<dyn Database> {
        &self.node.chain_db
    }

    pub fn event_mux(&self) -> &Arc<EventMux> {
        &self.node.event_mux
    }

    pub fn account_manager(&self) -> &Arc<Manager> {
        &self.node.account_manager
    }

    /// `(section size, indexed sections)`.
    pub fn bloom_status(&self) -> (u64, u64) {
        let (sections, _, _) = self.node.bloom_indexer.sections();
        (BLOOM_BITS_BLOCKS, sections)
    }

    /// Start the retrieval multiplexers for one log search.
    pub fn service_filter(&self, session: Arc<MatcherSession>) -> Result<FilterWorkers, BackendError> {
        self.node.ensure_running()?;
        self.node.metrics.filter_sessions.inc();
        Ok(FilterWorkers::spawn(session, self.node.bloom_requests.clone()))
    }
}
