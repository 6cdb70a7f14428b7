//! RPC service groups offered by the node.
//!
//! Transport and serialisation belong to the host. Each service here is a
//! plain method-call surface over the backend or the mining coordinator,
//! registered under a namespace and version.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use huc_consensus::EngineService;
use huc_core::{AccountState, ChainHeadEvent, MatcherSession, MuxEvent, Subscription, SyncProgress};
use huc_types::{Address, BlockRef, U256};

use crate::backend::ApiBackend;
use crate::error::{BackendError, NodeError};
use crate::mining::MiningCoordinator;
use crate::node::NodeCore;

/// One registered service group.
#[derive(Clone)]
pub struct RpcApi {
    pub namespace: &'static str,
    pub version: &'static str,
    pub service: RpcService,
    pub public: bool,
}

#[derive(Clone)]
pub enum RpcService {
    /// Chain and transaction-pool queries.
    Backend(Arc<ApiBackend>),
    Engine(EngineService),
    Huc(PublicHucApi),
    Miner(PublicMinerApi),
    Downloader(DownloaderApi),
    MinerControl(PrivateMinerApi),
    Filter(FilterApi),
    Admin(PrivateAdminApi),
    PublicDebug(PublicDebugApi),
    PrivateDebug(PrivateDebugApi),
    Net(Arc<NetApi>),
}

const VERSION: &str = "1.0";

fn api(namespace: &'static str, service: RpcService, public: bool) -> RpcApi {
    RpcApi {
        namespace,
        version: VERSION,
        service,
        public,
    }
}

pub(crate) fn node_apis(
    core: &Arc<NodeCore>,
    backend: &Arc<ApiBackend>,
    mining: &Arc<MiningCoordinator>,
    net: Option<&Arc<NetApi>>,
) -> Vec<RpcApi> {
    let mut apis = vec![
        api("eth", RpcService::Backend(backend.clone()), true),
        api("txpool", RpcService::Backend(backend.clone()), true),
    ];
    apis.extend(core.engine.apis().into_iter().map(|engine| RpcApi {
        namespace: engine.namespace,
        version: engine.version,
        service: RpcService::Engine(engine.service),
        public: engine.public,
    }));
    apis.extend([
        api("eth", RpcService::Huc(PublicHucApi::new(core.clone(), mining.clone())), true),
        api("eth", RpcService::Miner(PublicMinerApi::new(mining.clone())), true),
        api("eth", RpcService::Downloader(DownloaderApi::new(core.clone())), true),
        api(
            "miner",
            RpcService::MinerControl(PrivateMinerApi::new(core.clone(), mining.clone())),
            false,
        ),
        api("eth", RpcService::Filter(FilterApi::new(backend.clone())), true),
        api("admin", RpcService::Admin(PrivateAdminApi::new(core.clone())), false),
        api("debug", RpcService::PublicDebug(PublicDebugApi::new(backend.clone())), true),
        api("debug", RpcService::PrivateDebug(PrivateDebugApi::new(backend.clone())), false),
    ]);
    if let Some(net) = net {
        apis.push(api("net", RpcService::Net(net.clone()), true));
    }
    apis
}

// ── eth ─────────────────────────────────────────────────────────────────

/// Node-level information.
#[derive(Clone)]
pub struct PublicHucApi {
    core: Arc<NodeCore>,
    mining: Arc<MiningCoordinator>,
}

impl PublicHucApi {
    pub fn new(core: Arc<NodeCore>, mining: Arc<MiningCoordinator>) -> Self {
        Self { core, mining }
    }

    pub fn coinbase(&self) -> Result<Address, NodeError> {
        self.mining.coinbase()
    }

    pub fn hashrate(&self) -> u64 {
        self.mining.hashrate()
    }

    pub fn protocol_version(&self) -> u32 {
        self.core.protocol_version()
    }
}

#[derive(Clone)]
pub struct PublicMinerApi {
    mining: Arc<MiningCoordinator>,
}

impl PublicMinerApi {
    pub fn new(mining: Arc<MiningCoordinator>) -> Self {
        Self { mining }
    }

    pub fn mining(&self) -> bool {
        self.mining.is_mining()
    }
}

/// Synchronisation status.
#[derive(Clone)]
pub struct DownloaderApi {
    core: Arc<NodeCore>,
}

impl DownloaderApi {
    pub fn new(core: Arc<NodeCore>) -> Self {
        Self { core }
    }

    /// `None` once the node has caught up with its peers.
    pub fn syncing(&self) -> Option<SyncProgress> {
        let progress = self.core.protocol_manager.sync_progress();
        (progress.current_block < progress.highest_block).then_some(progress)
    }

    /// Sync started/done/failed notifications.
    pub fn subscribe_sync_events(&self) -> Subscription<MuxEvent> {
        self.core.event_mux.subscribe()
    }
}

/// Log search over the bloom index.
#[derive(Clone)]
pub struct FilterApi {
    backend: Arc<ApiBackend>,
}

impl FilterApi {
    pub fn new(backend: Arc<ApiBackend>) -> Self {
        Self { backend }
    }

    /// Blocks in `begin..=end` whose bloom has every bit in `bits` set.
    pub async fn matching_blocks(&self, bits: Vec<u32>, begin: u64, end: u64) -> Result<Vec<u64>, BackendError> {
        if begin > end {
            return Err(BackendError::InvalidRange { start: begin, end });
        }
        let session = Arc::new(MatcherSession::new(bits, begin, end));
        self.backend.service_filter(session.clone())?.join().await;
        if let Some(error) = session.error() {
            return Err(BackendError::Filter(error));
        }
        session
            .matches()
            .ok_or_else(|| BackendError::Filter("retrieval incomplete".into()))
    }

    pub fn subscribe_new_heads(&self) -> Subscription<ChainHeadEvent> {
        self.backend.subscribe_chain_head_event()
    }
}

// ── miner ───────────────────────────────────────────────────────────────

/// Mining control for the node operator.
#[derive(Clone)]
pub struct PrivateMinerApi {
    core: Arc<NodeCore>,
    mining: Arc<MiningCoordinator>,
}

impl PrivateMinerApi {
    pub fn new(core: Arc<NodeCore>, mining: Arc<MiningCoordinator>) -> Self {
        Self { core, mining }
    }

    /// Start mining, optionally changing the proof-of-work thread count.
    pub fn start(&self, threads: Option<i32>) -> Result<(), NodeError> {
        if let (Some(threads), Some(ethash)) = (threads, self.core.engine.ethash()) {
            tracing::info!(threads, "Updated mining threads");
            ethash.set_threads(threads);
        }
        if self.mining.is_mining() {
            return Ok(());
        }
        self.mining.start_mining(true)
    }

    pub fn stop(&self) -> bool {
        if let Some(ethash) = self.core.engine.ethash() {
            ethash.set_threads(-1);
        }
        self.mining.stop_mining();
        true
    }

    pub fn set_extra(&self, extra: &str) -> Result<bool, NodeError> {
        self.mining.set_extra(extra.as_bytes().to_vec())?;
        Ok(true)
    }

    pub fn set_gas_price(&self, price: U256) -> bool {
        self.mining.set_gas_price(price);
        true
    }

    pub fn set_coinbase(&self, coinbase: Address) -> bool {
        self.mining.set_coinbase(coinbase);
        true
    }

    pub fn hashrate(&self) -> u64 {
        self.mining.hashrate()
    }
}

// ── admin ───────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct PrivateAdminApi {
    core: Arc<NodeCore>,
}

impl PrivateAdminApi {
    pub fn new(core: Arc<NodeCore>) -> Self {
        Self { core }
    }

    /// Write the canonical chain to `path`, one JSON block per line.
    /// Returns the number of blocks written.
    pub fn export_chain(&self, path: &Path) -> Result<u64, NodeError> {
        let head = self.core.chain.current_block()?.number();
        let mut out = BufWriter::new(File::create(path)?);
        let mut written = 0;
        for number in 0..=head {
            let Some(block) = self.core.chain.block_by_number(number)? else {
                break;
            };
            serde_json::to_writer(&mut out, &block).map_err(std::io::Error::from)?;
            out.write_all(b"\n")?;
            written += 1;
        }
        out.flush()?;
        tracing::info!(path = %path.display(), blocks = written, "Exported blockchain");
        Ok(written)
    }
}

// ── debug ───────────────────────────────────────────────────────────────

/// Account dump of a state snapshot.
pub type StateDump = BTreeMap<Address, AccountState>;

#[derive(Clone)]
pub struct PublicDebugApi {
    backend: Arc<ApiBackend>,
}

impl PublicDebugApi {
    pub fn new(backend: Arc<ApiBackend>) -> Self {
        Self { backend }
    }

    /// Every account in the state at `block`.
    pub fn dump_block(&self, block: BlockRef) -> Result<Option<StateDump>, BackendError> {
        Ok(self.backend.state_and_header_by_number(block)?.map(|(state, _)| {
            state
                .accounts()
                .map(|(address, account)| (*address, account.clone()))
                .collect()
        }))
    }
}

#[derive(Clone)]
pub struct PrivateDebugApi {
    backend: Arc<ApiBackend>,
}

impl PrivateDebugApi {
    pub fn new(backend: Arc<ApiBackend>) -> Self {
        Self { backend }
    }

    /// Accounts whose balance or nonce differ between the states of two
    /// blocks. With no `end`, compares `start` against its parent.
    pub fn modified_accounts_by_number(&self, start: u64, end: Option<u64>) -> Result<Vec<Address>, BackendError> {
        let (start, end) = match end {
            Some(end) => (start, end),
            None => (start.saturating_sub(1), start),
        };
        if start >= end {
            return Err(BackendError::InvalidRange { start, end });
        }
        let (old, _) = self
            .backend
            .state_and_header_by_number(BlockRef::Numbered(start))?
            .ok_or(BackendError::UnknownBlock(start))?;
        let (new, _) = self
            .backend
            .state_and_header_by_number(BlockRef::Numbered(end))?
            .ok_or(BackendError::UnknownBlock(end))?;

        let mut modified: Vec<Address> = new
            .accounts()
            .filter(|(address, account)| {
                !old.exists(address)
                    || old.get_balance(address) != account.balance
                    || old.get_nonce(address) != account.nonce
            })
            .map(|(address, _)| *address)
            .collect();
        modified.extend(
            old.accounts()
                .filter(|(address, _)| !new.exists(address))
                .map(|(address, _)| *address),
        );
        modified.sort();
        Ok(modified)
    }

    /// Rewind the canonical chain to `number`.
    pub fn set_head(&self, number: u64) -> Result<(), BackendError> {
        self.backend.set_head(number)
    }
}

// ── net ─────────────────────────────────────────────────────────────────

/// Network information, created when the node starts.
pub struct NetApi {
    core: Arc<NodeCore>,
}

impl NetApi {
    pub fn new(core: Arc<NodeCore>) -> Self {
        Self { core }
    }

    pub fn listening(&self) -> bool {
        true
    }

    pub fn peer_count(&self) -> usize {
        self.core.protocol_manager.peer_count()
    }

    /// The network id, as a decimal string.
    pub fn version(&self) -> String {
        self.core.network_id.to_string()
    }
}
