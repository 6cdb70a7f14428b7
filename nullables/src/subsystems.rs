//! Nullable subsystem builder.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use huc_consensus::ConsensusEngine;
use huc_core::{
    BlockChain, BloomIndexer, CacheConfig, ChainError, CoreError, EventMux, Miner,
    ProtocolManager, ProtocolManagerArgs, SubsystemBuilder, TxPool, TxPoolConfig, VmConfig,
};
use huc_store::Database;
use huc_types::{ChainConfig, SyncMode};
use parking_lot::Mutex;

use crate::{CallJournal, NullBloomIndexer, NullChain, NullMiner, NullProtocolManager, NullTxPool};

/// What the protocol manager was built with.
#[derive(Clone, Debug)]
pub struct ProtocolManagerRecord {
    pub sync_mode: SyncMode,
    pub network_id: u64,
}

/// Builds the null subsystems and keeps a handle to each one it built.
#[derive(Default)]
pub struct NullSubsystems {
    fail_protocol_manager: AtomicBool,
    chain: Mutex<Option<Arc<NullChain>>>,
    tx_pool: Mutex<Option<Arc<NullTxPool>>>,
    miner: Mutex<Option<Arc<NullMiner>>>,
    protocol_manager: Mutex<Option<Arc<NullProtocolManager>>>,
    protocol_record: Mutex<Option<ProtocolManagerRecord>>,
    bloom_indexer: Mutex<Option<Arc<NullBloomIndexer>>>,
    journal: CallJournal,
}

impl NullSubsystems {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subsystems built by this instance record their lifecycle in `journal`.
    pub fn with_journal(journal: CallJournal) -> Self {
        Self {
            journal,
            ..Self::default()
        }
    }

    /// Make the next protocol manager construction fail.
    pub fn fail_protocol_manager(&self, fail: bool) {
        self.fail_protocol_manager.store(fail, Ordering::Release);
    }

    pub fn chain(&self) -> Option<Arc<NullChain>> {
        self.chain.lock().clone()
    }

    pub fn tx_pool(&self) -> Option<Arc<NullTxPool>> {
        self.tx_pool.lock().clone()
    }

    pub fn miner(&self) -> Option<Arc<NullMiner>> {
        self.miner.lock().clone()
    }

    pub fn protocol_manager(&self) -> Option<Arc<NullProtocolManager>> {
        self.protocol_manager.lock().clone()
    }

    pub fn protocol_record(&self) -> Option<ProtocolManagerRecord> {
        self.protocol_record.lock().clone()
    }

    pub fn bloom_indexer(&self) -> Option<Arc<NullBloomIndexer>> {
        self.bloom_indexer.lock().clone()
    }
}

impl SubsystemBuilder for NullSubsystems {
    fn bloom_indexer(&self, _db: Arc<dyn Database>, section_size: u64) -> Arc<dyn BloomIndexer> {
        let indexer = Arc::new(NullBloomIndexer::new(section_size).with_journal(self.journal.clone()));
        *self.bloom_indexer.lock() = Some(indexer.clone());
        indexer
    }

    fn blockchain(
        &self,
        db: Arc<dyn Database>,
        cache: CacheConfig,
        chain_config: ChainConfig,
        engine: ConsensusEngine,
        vm: VmConfig,
    ) -> Result<Arc<dyn BlockChain>, ChainError> {
        let chain = Arc::new(
            NullChain::new(db, chain_config, engine, cache, vm)?.with_journal(self.journal.clone()),
        );
        *self.chain.lock() = Some(chain.clone());
        Ok(chain)
    }

    fn tx_pool(&self, config: TxPoolConfig, _chain_config: &ChainConfig, chain: Arc<dyn BlockChain>) -> Arc<dyn TxPool> {
        let pool = Arc::new(NullTxPool::new(config, chain).with_journal(self.journal.clone()));
        *self.tx_pool.lock() = Some(pool.clone());
        pool
    }

    fn protocol_manager(&self, args: ProtocolManagerArgs) -> Result<Arc<dyn ProtocolManager>, CoreError> {
        if self.fail_protocol_manager.load(Ordering::Acquire) {
            return Err(CoreError::Protocol("protocol manager construction refused".into()));
        }
        *self.protocol_record.lock() = Some(ProtocolManagerRecord {
            sync_mode: args.sync_mode,
            network_id: args.network_id,
        });
        let pm = Arc::new(NullProtocolManager::new().with_journal(self.journal.clone()));
        *self.protocol_manager.lock() = Some(pm.clone());
        Ok(pm)
    }

    fn miner(
        &self,
        chain: Arc<dyn BlockChain>,
        tx_pool: Arc<dyn TxPool>,
        _engine: ConsensusEngine,
        _event_mux: Arc<EventMux>,
    ) -> Arc<dyn Miner> {
        let miner = Arc::new(
            NullMiner::new(chain, tx_pool).with_journal(self.journal.clone()),
        );
        *self.miner.lock() = Some(miner.clone());
        miner
    }
}
