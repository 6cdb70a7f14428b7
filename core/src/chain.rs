//! The chain state machine contract.

use std::time::Duration;

use huc_consensus::{ChainReader, ConsensusEngine};
use huc_types::{Block, Hash, Log, U256};

use crate::event::{ChainEvent, ChainHeadEvent, ChainSideEvent, RemovedLogsEvent, Subscription};
use crate::state::StateDb;
use crate::ChainError;

/// Trie caching and pruning behaviour of the chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheConfig {
    /// Keep every state snapshot (archive mode).
    pub disabled: bool,
    /// Memory allowance in MB before state is flushed to disk.
    pub trie_node_limit: usize,
    /// Time limit after which state is flushed regardless of memory use.
    pub trie_time_limit: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            disabled: false,
            trie_node_limit: 256,
            trie_time_limit: Duration::from_secs(5 * 60),
        }
    }
}

/// The canonical chain, its state and its event streams.
///
/// Implementations synchronise internally; every method may be called
/// concurrently. Unknown blocks are `Ok(None)`.
pub trait BlockChain: ChainReader {
    /// The canonical head.
    fn current_block(&self) -> Result<Block, ChainError>;

    fn block_by_number(&self, number: u64) -> Result<Option<Block>, ChainError>;

    fn block_by_hash(&self, hash: &Hash) -> Result<Option<Block>, ChainError>;

    /// The state snapshot at `root`; [`ChainError::MissingState`] if it was
    /// never stored or has been pruned.
    fn state_at(&self, root: &Hash) -> Result<StateDb, ChainError>;

    /// Rewind the canonical head to `number`.
    fn set_head(&self, number: u64) -> Result<(), ChainError>;

    /// Total difficulty of the chain up to and including `hash`.
    fn td_by_hash(&self, hash: &Hash) -> Result<Option<U256>, ChainError>;

    fn engine(&self) -> &ConsensusEngine;

    /// Wipe the chain and restart it from `genesis`.
    fn reset_with_genesis_block(&self, genesis: Block) -> Result<(), ChainError>;

    fn subscribe_chain_event(&self) -> Subscription<ChainEvent>;

    fn subscribe_chain_head_event(&self) -> Subscription<ChainHeadEvent>;

    fn subscribe_chain_side_event(&self) -> Subscription<ChainSideEvent>;

    fn subscribe_logs_event(&self) -> Subscription<Vec<Log>>;

    fn subscribe_removed_logs_event(&self) -> Subscription<RemovedLogsEvent>;

    /// Flush pending writes and stop background work.
    fn stop(&self);
}
