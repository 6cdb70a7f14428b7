//! The HappyUC full node — wires chain, pool, miner, protocol layer and
//! bloom indexer together and drives their lifecycle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use huc_consensus::{create_consensus_engine, ConsensusEngine};
use huc_core::{
    setup_genesis_block, BlockChain, BloomIndexer, BloomRequest, EventMux, LesServer, Manager,
    Miner, Protocol, ProtocolManager, ProtocolManagerArgs, TxPool, VmConfig,
};
use huc_store::meta::{
    read_database_version, write_chain_config, write_database_version, BLOCKCHAIN_VERSION,
};
use huc_store::Database;
use huc_types::params::{packed_version, BLOOM_BITS_BLOCKS, CLIENT_NAME, MAXIMUM_EXTRA_DATA_SIZE};
use huc_types::{Block, ChainConfig};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::api::{self, NetApi, RpcApi};
use crate::backend::ApiBackend;
use crate::bloombits::{start_bloom_handlers, BLOOM_SERVICE_THREADS};
use crate::config::NodeConfig;
use crate::context::ServiceContext;
use crate::error::{BackendError, NodeError};
use crate::gasprice::Oracle;
use crate::metrics::NodeMetrics;
use crate::migration::MigrationTask;
use crate::mining::{MiningCoordinator, MiningParams};
use crate::shutdown::ShutdownController;

/// Timeout for waiting on background tasks during shutdown.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Name of the chain database handed to the opener.
const CHAIN_DB_NAME: &str = "chaindata";

/// The subsystems shared by the node, the API backend and the RPC services.
///
/// Every field is set once during construction.
pub struct NodeCore {
    pub(crate) config: NodeConfig,
    pub(crate) chain_config: ChainConfig,
    pub(crate) network_id: u64,
    pub(crate) chain_db: Arc<dyn Database>,
    pub(crate) chain: Arc<dyn BlockChain>,
    pub(crate) tx_pool: Arc<dyn TxPool>,
    pub(crate) protocol_manager: Arc<dyn ProtocolManager>,
    pub(crate) miner: Arc<dyn Miner>,
    pub(crate) engine: ConsensusEngine,
    pub(crate) account_manager: Arc<Manager>,
    pub(crate) event_mux: Arc<EventMux>,
    pub(crate) bloom_indexer: Arc<dyn BloomIndexer>,
    pub(crate) bloom_requests: mpsc::Sender<BloomRequest>,
    pub(crate) vm_config: VmConfig,
    pub(crate) metrics: Arc<NodeMetrics>,
    stopped: AtomicBool,
}

impl NodeCore {
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    pub(crate) fn ensure_running(&self) -> Result<(), BackendError> {
        if self.is_stopped() {
            return Err(BackendError::Stopped);
        }
        Ok(())
    }

    /// Version of the first advertised sub-protocol.
    pub fn protocol_version(&self) -> u32 {
        self.protocol_manager
            .sub_protocols()
            .first()
            .map_or(0, |p| p.version)
    }
}

/// A running full node.
pub struct HucNode {
    core: Arc<NodeCore>,
    api_backend: Arc<ApiBackend>,
    mining: Arc<MiningCoordinator>,
    les_server: Option<Arc<dyn LesServer>>,
    net_api: Option<Arc<NetApi>>,
    migration: Option<MigrationTask>,
    /// Taken by `start` when the bloom handlers are launched.
    bloom_receiver: Option<mpsc::Receiver<BloomRequest>>,
    shutdown: Arc<ShutdownController>,
    /// Handles for spawned background tasks (joined during shutdown).
    task_handles: Vec<JoinHandle<()>>,
}

impl HucNode {
    /// Construct every subsystem, in dependency order.
    ///
    /// Must run inside a tokio runtime: the storage migration is spawned
    /// here. A failure part-way releases what was already built.
    pub fn new(ctx: &ServiceContext, config: NodeConfig) -> Result<Self, NodeError> {
        let sync_mode = config.full_node_sync_mode()?;
        let metrics = Arc::new(NodeMetrics::new()?);
        let mut unwind = Unwind::default();

        let chain_db = ctx.open_database(CHAIN_DB_NAME, config.database_cache, config.database_handles)?;
        unwind.db = Some(chain_db.clone());
        unwind.migration = MigrationTask::spawn(chain_db.clone())?;

        let (chain_config, genesis_hash, compat) =
            setup_genesis_block(chain_db.as_ref(), config.genesis.as_ref())?;
        tracing::info!(config = %chain_config, genesis = %genesis_hash, "Initialised chain configuration");

        let engine = create_consensus_engine(ctx.data_dir(), &config.ethash, &chain_config, chain_db.clone())?;

        tracing::info!(
            network = config.network_id,
            engine = engine.name(),
            sync_mode = %sync_mode,
            "Initialising HappyUC protocol"
        );

        if !config.skip_bc_version_check {
            check_database_version(chain_db.as_ref())?;
        }

        let bloom_indexer = ctx.subsystems.bloom_indexer(chain_db.clone(), BLOOM_BITS_BLOCKS);
        unwind.indexer = Some(bloom_indexer.clone());

        let vm_config = config.vm_config();
        let chain = ctx.subsystems.blockchain(
            chain_db.clone(),
            config.cache_config(),
            chain_config.clone(),
            engine.clone(),
            vm_config.clone(),
        )?;
        unwind.chain = Some(chain.clone());

        if let Some(compat) = compat {
            tracing::warn!(error = %compat, "Rewinding chain to upgrade configuration");
            chain.set_head(compat.rewind_to)?;
            write_chain_config(chain_db.as_ref(), &genesis_hash, &chain_config)?;
        }
        bloom_indexer.start(chain.clone());

        let tx_pool = ctx.subsystems.tx_pool(
            config.tx_pool.resolve_journal(ctx.data_dir()),
            &chain_config,
            chain.clone(),
        );
        unwind.tx_pool = Some(tx_pool.clone());

        let protocol_manager = ctx.subsystems.protocol_manager(ProtocolManagerArgs {
            chain_config: chain_config.clone(),
            sync_mode,
            network_id: config.network_id,
            event_mux: ctx.event_mux.clone(),
            tx_pool: tx_pool.clone(),
            engine: engine.clone(),
            chain: chain.clone(),
            chain_db: chain_db.clone(),
        })?;

        let miner = ctx
            .subsystems
            .miner(chain.clone(), tx_pool.clone(), engine.clone(), ctx.event_mux.clone());
        miner.set_extra(make_extra_data(config.extra_data.as_bytes()))?;

        let (bloom_requests, bloom_receiver) = mpsc::channel(BLOOM_SERVICE_THREADS);
        let mining = Arc::new(MiningCoordinator::new(
            MiningParams {
                coinbase: config.coinbase,
                gas_price: config.gas_price,
            },
            miner.clone(),
            engine.clone(),
            ctx.account_manager.clone(),
            protocol_manager.clone(),
            tx_pool.clone(),
            metrics.clone(),
        ));
        let gpo = Oracle::new(chain.clone(), config.gpo_config());

        let core = Arc::new(NodeCore {
            network_id: config.network_id,
            config,
            chain_config,
            chain_db,
            chain,
            tx_pool,
            protocol_manager,
            miner,
            engine,
            account_manager: ctx.account_manager.clone(),
            event_mux: ctx.event_mux.clone(),
            bloom_indexer,
            bloom_requests,
            vm_config,
            metrics,
            stopped: AtomicBool::new(false),
        });
        let api_backend = Arc::new(ApiBackend::new(core.clone(), gpo));

        Ok(Self {
            core,
            api_backend,
            mining,
            les_server: None,
            net_api: None,
            migration: unwind.disarm(),
            bloom_receiver: Some(bloom_receiver),
            shutdown: Arc::new(ShutdownController::new()),
            task_handles: Vec::new(),
        })
    }

    /// Attach a light-client server. It shares the bloom indexer and is
    /// started and stopped with the node.
    pub fn add_les_server(&mut self, server: Arc<dyn LesServer>) {
        server.set_bloom_indexer(self.core.bloom_indexer.clone());
        self.les_server = Some(server);
    }

    /// Sub-protocols to advertise to peers.
    pub fn protocols(&self) -> Vec<Protocol> {
        let mut protocols = self.core.protocol_manager.sub_protocols();
        if let Some(les) = &self.les_server {
            protocols.extend(les.protocols());
        }
        protocols
    }

    /// Launch the bloom handlers and begin accepting up to `max_peers` peers.
    ///
    /// Only the light-peer reservation can fail; the protocol layer and the
    /// light server start unconditionally.
    pub fn start(&mut self, max_peers: usize) -> Result<(), NodeError> {
        match self.bloom_receiver.take() {
            Some(receiver) => self.task_handles.extend(start_bloom_handlers(
                self.core.chain_db.clone(),
                receiver,
                &self.shutdown,
                self.core.metrics.clone(),
            )),
            None => tracing::warn!("bloom handlers already running"),
        }

        self.net_api = Some(Arc::new(NetApi::new(self.core.clone())));

        let mut max_peers = max_peers;
        if self.core.config.light_serv > 0 {
            let light_peers = self.core.config.light_peers;
            if light_peers >= max_peers {
                return Err(NodeError::InvalidPeerConfig {
                    light_peers,
                    max_peers,
                });
            }
            max_peers -= light_peers;
        }

        self.core.protocol_manager.start(max_peers);
        if let Some(les) = &self.les_server {
            les.start();
        }
        tracing::info!(max_peers, network = self.core.network_id, "HappyUC node started");
        Ok(())
    }

    /// Tear every subsystem down, producers before consumers, then wait for
    /// the background tasks. A second call is a no-op.
    pub async fn stop(&mut self) -> Result<(), NodeError> {
        if self.core.stopped.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        tracing::info!("HappyUC node stopping");

        if let Some(migration) = self.migration.take() {
            if let Some(outcome) = migration.stop(SHUTDOWN_TIMEOUT).await {
                tracing::debug!(?outcome, "database migration stopped");
            }
        }
        if let Err(e) = self.core.bloom_indexer.close() {
            tracing::warn!(error = %e, "bloom indexer close failed");
        }
        self.core.chain.stop();
        tracing::debug!("blockchain stopped");
        self.core.protocol_manager.stop();
        if let Some(les) = &self.les_server {
            les.stop();
            tracing::debug!("light server stopped");
        }
        self.core.tx_pool.stop();
        tracing::debug!("transaction pool stopped");
        self.mining.stop_mining();
        self.core.event_mux.stop();
        self.core.chain_db.close();
        tracing::debug!("chain database closed");
        self.shutdown.shutdown();

        let mut handles: Vec<JoinHandle<()>> = self.task_handles.drain(..).collect();
        handles.extend(self.mining.take_tasks());
        let wait_all = async {
            for handle in handles {
                let _ = handle.await;
            }
        };
        if tokio::time::timeout(SHUTDOWN_TIMEOUT, wait_all).await.is_err() {
            tracing::warn!(
                "shutdown timeout ({:?}) — some tasks may still be running",
                SHUTDOWN_TIMEOUT
            );
            return Err(NodeError::ShutdownTimeout);
        }

        tracing::info!("HappyUC node stopped");
        Ok(())
    }

    /// Wipe the chain and restart it from `genesis`.
    pub fn reset_with_genesis_block(&self, genesis: Block) -> Result<(), NodeError> {
        Ok(self.core.chain.reset_with_genesis_block(genesis)?)
    }

    /// The RPC service groups this node offers.
    pub fn apis(&self) -> Vec<RpcApi> {
        api::node_apis(
            &self.core,
            &self.api_backend,
            &self.mining,
            self.net_api.as_ref(),
        )
    }

    // ── Accessors ───────────────────────────────────────────────────────

    pub fn core(&self) -> &Arc<NodeCore> {
        &self.core
    }

    pub fn api_backend(&self) -> &Arc<ApiBackend> {
        &self.api_backend
    }

    pub fn mining(&self) -> &Arc<MiningCoordinator> {
        &self.mining
    }

    pub fn config(&self) -> &NodeConfig {
        &self.core.config
    }

    pub fn chain_config(&self) -> &ChainConfig {
        &self.core.chain_config
    }

    pub fn account_manager(&self) -> &Arc<Manager> {
        &self.core.account_manager
    }

    pub fn blockchain(&self) -> &Arc<dyn BlockChain> {
        &self.core.chain
    }

    pub fn tx_pool(&self) -> &Arc<dyn TxPool> {
        &self.core.tx_pool
    }

    pub fn event_mux(&self) -> &Arc<EventMux> {
        &self.core.event_mux
    }

    pub fn engine(&self) -> &ConsensusEngine {
        &self.core.engine
    }

    pub fn chain_db(&self) -> &Arc<dyn Database> {
        &self.core.chain_db
    }

    pub fn miner(&self) -> &Arc<dyn Miner> {
        &self.core.miner
    }

    pub fn protocol_manager(&self) -> &Arc<dyn ProtocolManager> {
        &self.core.protocol_manager
    }

    pub fn metrics(&self) -> &Arc<NodeMetrics> {
        &self.core.metrics
    }

    pub fn is_listening(&self) -> bool {
        true
    }

    pub fn protocol_version(&self) -> u32 {
        self.core.protocol_version()
    }

    pub fn net_version(&self) -> u64 {
        self.core.network_id
    }

    pub fn is_stopped(&self) -> bool {
        self.core.is_stopped()
    }
}

/// Refuse databases written by an incompatible layout; stamp fresh ones.
fn check_database_version(db: &dyn Database) -> Result<(), NodeError> {
    match read_database_version(db)? {
        Some(stored) if stored != 0 && stored != BLOCKCHAIN_VERSION => {
            Err(NodeError::SchemaVersionMismatch {
                stored,
                expected: BLOCKCHAIN_VERSION,
            })
        }
        _ => {
            write_database_version(db, BLOCKCHAIN_VERSION)?;
            Ok(())
        }
    }
}

/// The extra data stamped into mined blocks.
///
/// An empty payload is replaced by the client tag. Anything longer than
/// [`MAXIMUM_EXTRA_DATA_SIZE`] is dropped.
pub fn make_extra_data(extra: &[u8]) -> Vec<u8> {
    let extra = if extra.is_empty() {
        default_extra_data()
    } else {
        extra.to_vec()
    };
    if extra.len() > MAXIMUM_EXTRA_DATA_SIZE {
        tracing::warn!(
            extra = %hex::encode(&extra),
            limit = MAXIMUM_EXTRA_DATA_SIZE,
            "Miner extra data exceed limit"
        );
        return Vec::new();
    }
    extra
}

/// Packed version followed by length-prefixed client, runtime and OS names.
fn default_extra_data() -> Vec<u8> {
    let mut extra = packed_version().to_be_bytes().to_vec();
    for part in [CLIENT_NAME, "rust", std::env::consts::OS] {
        let part = &part.as_bytes()[..part.len().min(u8::MAX as usize)];
        extra.push(part.len() as u8);
        extra.extend_from_slice(part);
    }
    extra
}

/// Releases what a failed construction already acquired, newest first.
#[derive(Default)]
struct Unwind {
    db: Option<Arc<dyn Database>>,
    migration: Option<MigrationTask>,
    indexer: Option<Arc<dyn BloomIndexer>>,
    chain: Option<Arc<dyn BlockChain>>,
    tx_pool: Option<Arc<dyn TxPool>>,
    disarmed: bool,
}

impl Unwind {
    /// Construction succeeded; keep everything and hand back the migration.
    fn disarm(mut self) -> Option<MigrationTask> {
        self.disarmed = true;
        self.migration.take()
    }
}

impl Drop for Unwind {
    fn drop(&mut self) {
        if self.disarmed {
            return;
        }
        tracing::debug!("unwinding partially constructed node");
        if let Some(tx_pool) = self.tx_pool.take() {
            tx_pool.stop();
        }
        if let Some(chain) = self.chain.take() {
            chain.stop();
        }
        if let Some(indexer) = self.indexer.take() {
            if let Err(e) = indexer.close() {
                tracing::warn!(error = %e, "bloom indexer close failed");
            }
        }
        if let Some(migration) = self.migration.take() {
            migration.cancel();
        }
        if let Some(db) = self.db.take() {
            db.close();
        }
    }
}
