//! Factory for the subsystems a node composes.

use std::sync::Arc;

use huc_consensus::ConsensusEngine;
use huc_store::Database;
use huc_types::{ChainConfig, SyncMode};

use crate::bloombits::BloomIndexer;
use crate::chain::{BlockChain, CacheConfig};
use crate::event::EventMux;
use crate::miner::Miner;
use crate::protocol::ProtocolManager;
use crate::txpool::{TxPool, TxPoolConfig};
use crate::vm::VmConfig;
use crate::{ChainError, CoreError};

/// Everything the protocol layer is wired to.
pub struct ProtocolManagerArgs {
    pub chain_config: ChainConfig,
    pub sync_mode: SyncMode,
    pub network_id: u64,
    pub event_mux: Arc<EventMux>,
    pub tx_pool: Arc<dyn TxPool>,
    pub engine: ConsensusEngine,
    pub chain: Arc<dyn BlockChain>,
    pub chain_db: Arc<dyn Database>,
}

/// Constructs the node's collaborators, in the order the node needs them.
pub trait SubsystemBuilder: Send + Sync {
    /// The bloom indexer, built before the chain and started against it.
    fn bloom_indexer(&self, db: Arc<dyn Database>, section_size: u64) -> Arc<dyn BloomIndexer>;

    fn blockchain(
        &self,
        db: Arc<dyn Database>,
        cache: CacheConfig,
        chain_config: ChainConfig,
        engine: ConsensusEngine,
        vm: VmConfig,
    ) -> Result<Arc<dyn BlockChain>, ChainError>;

    fn tx_pool(&self, config: TxPoolConfig, chain_config: &ChainConfig, chain: Arc<dyn BlockChain>) -> Arc<dyn TxPool>;

    fn protocol_manager(&self, args: ProtocolManagerArgs) -> Result<Arc<dyn ProtocolManager>, CoreError>;

    fn miner(
        &self,
        chain: Arc<dyn BlockChain>,
        tx_pool: Arc<dyn TxPool>,
        engine: ConsensusEngine,
        event_mux: Arc<EventMux>,
    ) -> Arc<dyn Miner>;
}
