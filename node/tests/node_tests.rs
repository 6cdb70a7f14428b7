//! Node construction, lifecycle and query behaviour against the nullable
//! subsystems.

use std::sync::Arc;

use huc_consensus::clique::genesis_extra;
use huc_consensus::PowMode;
use huc_core::{
    BlockChain, BloomIndexer, CoreError, Genesis, GenesisAccount, Manager, MatcherSession, Message,
    Miner, ProtocolManager,
};
use huc_node::api::{FilterApi, PrivateAdminApi, PrivateDebugApi, PublicDebugApi};
use huc_node::{BackendError, HucNode, NodeConfig, NodeError, RpcService, ServiceContext};
use huc_nullables::{CallJournal, NullDatabaseOpener, NullLesServer, NullSubsystems, NullWallet};
use huc_store::bloombits::write_bloom_bits;
use huc_store::chain::write_canonical_hash;
use huc_store::lookup::is_dedup_complete;
use huc_store::meta::{read_chain_config, write_database_version, BLOCKCHAIN_VERSION};
use huc_store::{Database, DatabaseOpener};
use huc_types::params::BLOOM_BITS_BLOCKS;
use huc_types::{Address, BlockRef, ChainConfig, CliqueConfig, Hash, Transaction, U256};

const FUNDED_SEED: [u8; 32] = [1; 32];

struct TestNode {
    node: HucNode,
    subsystems: Arc<NullSubsystems>,
    opener: Arc<NullDatabaseOpener>,
    accounts: Arc<Manager>,
}

fn private_genesis(config: ChainConfig) -> Genesis {
    let mut genesis = Genesis::with_config(config);
    genesis.extra_data = b"node tests".to_vec();
    genesis.alloc.insert(
        NullWallet::address_of(&FUNDED_SEED),
        GenesisAccount {
            balance: U256::from(1_000_000_000_000u64),
            nonce: 0,
        },
    );
    genesis
}

fn fake_config() -> NodeConfig {
    let mut config = NodeConfig {
        genesis: Some(private_genesis(ChainConfig::all_forks(1337))),
        network_id: 1337,
        ..NodeConfig::default()
    };
    config.ethash.pow_mode = PowMode::Fake;
    config
}

fn build_with(
    config: NodeConfig,
    opener: Arc<NullDatabaseOpener>,
    accounts: Arc<Manager>,
) -> Result<TestNode, NodeError> {
    let subsystems = Arc::new(NullSubsystems::new());
    let ctx = ServiceContext::new(None, opener.clone(), accounts.clone(), subsystems.clone());
    let node = HucNode::new(&ctx, config)?;
    Ok(TestNode {
        node,
        subsystems,
        opener,
        accounts,
    })
}

fn build(config: NodeConfig) -> TestNode {
    build_with(config, Arc::new(NullDatabaseOpener::new()), Arc::new(Manager::default())).unwrap()
}

impl TestNode {
    fn extend(&self, blocks: u64) {
        self.subsystems.chain().unwrap().extend(blocks).unwrap();
    }

    fn chain_db(&self) -> Arc<dyn Database> {
        self.node.chain_db().clone()
    }
}

// ── Construction ────────────────────────────────────────────────────────

#[tokio::test]
async fn light_sync_is_rejected_before_storage_opens() {
    let opener = Arc::new(NullDatabaseOpener::new());
    let config = NodeConfig {
        sync_mode: "light".into(),
        ..fake_config()
    };
    let result = build_with(config, opener.clone(), Arc::new(Manager::default()));
    assert!(matches!(result, Err(NodeError::LightSyncUnsupported)));
    assert!(opener.opened().is_empty());
}

#[tokio::test]
async fn unknown_sync_mode_is_rejected() {
    let config = NodeConfig {
        sync_mode: "warp".into(),
        ..fake_config()
    };
    let result = build_with(config, Arc::new(NullDatabaseOpener::new()), Arc::new(Manager::default()));
    assert!(matches!(result, Err(NodeError::InvalidSyncMode(mode)) if mode == "warp"));
}

#[tokio::test]
async fn construction_wires_configuration_through() {
    let mut config = fake_config();
    config.sync_mode = "full".into();
    config.database_cache = 64;
    config.database_handles = 16;
    config.no_pruning = true;
    let t = build(config);

    assert_eq!(t.opener.opened(), vec![("chaindata".to_string(), 64, 16)]);
    let record = t.subsystems.protocol_record().unwrap();
    assert_eq!(record.network_id, 1337);
    assert_eq!(record.sync_mode.to_string(), "full");
    assert!(t.subsystems.chain().unwrap().cache_config().disabled);
    assert!(t.subsystems.bloom_indexer().unwrap().is_started());
    assert_eq!(t.node.net_version(), 1337);
    assert_eq!(t.node.engine().name(), "ethash");
    assert!(!t.subsystems.miner().unwrap().extra().is_empty());
}

#[tokio::test]
async fn schema_version_mismatch_is_fatal() {
    let opener = Arc::new(NullDatabaseOpener::new());
    let db = opener.open("chaindata", 0, 0).unwrap();
    write_database_version(db.as_ref(), BLOCKCHAIN_VERSION + 1).unwrap();

    let result = build_with(fake_config(), opener.clone(), Arc::new(Manager::default()));
    assert!(matches!(
        result,
        Err(NodeError::SchemaVersionMismatch { stored, expected })
            if stored == BLOCKCHAIN_VERSION + 1 && expected == BLOCKCHAIN_VERSION
    ));

    let skipping = NodeConfig {
        skip_bc_version_check: true,
        ..fake_config()
    };
    assert!(build_with(skipping, opener, Arc::new(Manager::default())).is_ok());
}

#[tokio::test]
async fn protocol_failure_releases_earlier_subsystems() {
    let opener = Arc::new(NullDatabaseOpener::new());
    let subsystems = Arc::new(NullSubsystems::new());
    subsystems.fail_protocol_manager(true);
    let ctx = ServiceContext::new(None, opener.clone(), Arc::new(Manager::default()), subsystems.clone());

    let result = HucNode::new(&ctx, fake_config());
    assert!(matches!(result, Err(NodeError::Core(CoreError::Protocol(_)))));
    assert!(subsystems.chain().unwrap().is_stopped());
    assert!(subsystems.tx_pool().unwrap().is_stopped());
    assert!(subsystems.bloom_indexer().unwrap().is_closed());
    assert!(subsystems.miner().is_none());
    assert!(opener.handle("chaindata").unwrap().is_closed());
}

#[tokio::test]
async fn config_upgrade_rewinds_once_and_persists() {
    let opener = Arc::new(NullDatabaseOpener::new());
    let mut stored = ChainConfig::all_forks(1337);
    stored.byzantium_block = Some(10);
    let genesis = private_genesis(stored);
    let config = NodeConfig {
        genesis: Some(genesis.clone()),
        ..fake_config()
    };

    let mut first = build_with(config.clone(), opener.clone(), Arc::new(Manager::default())).unwrap();
    first.extend(20);
    first.node.stop().await.unwrap();

    let mut moved = genesis.clone();
    moved.config.byzantium_block = Some(5);
    let upgraded = NodeConfig {
        genesis: Some(moved.clone()),
        ..config
    };
    let mut second = build_with(upgraded.clone(), opener.clone(), Arc::new(Manager::default())).unwrap();
    assert_eq!(second.subsystems.chain().unwrap().rewinds(), vec![4]);
    assert_eq!(second.node.blockchain().current_block().unwrap().number(), 4);
    assert_eq!(
        read_chain_config(second.chain_db().as_ref(), &genesis.hash()).unwrap(),
        Some(moved.config.clone())
    );
    second.node.stop().await.unwrap();

    let third = build_with(upgraded, opener, Arc::new(Manager::default())).unwrap();
    assert!(third.subsystems.chain().unwrap().rewinds().is_empty());
    assert_eq!(third.node.chain_config(), &moved.config);
}

// ── Block references ────────────────────────────────────────────────────

#[tokio::test]
async fn header_matches_block_for_every_reference() {
    let t = build(fake_config());
    t.extend(3);
    let backend = t.node.api_backend();

    let refs = [
        BlockRef::Latest,
        BlockRef::Pending,
        BlockRef::Numbered(0),
        BlockRef::Numbered(2),
        BlockRef::Numbered(3),
    ];
    for block_ref in refs {
        let header = backend.header_by_number(block_ref).unwrap().unwrap();
        let block = backend.block_by_number(block_ref).unwrap().unwrap();
        assert_eq!(header, block.header, "{block_ref:?}");
    }
}

#[tokio::test]
async fn pending_is_not_latest_and_numbered_head_is() {
    let t = build(fake_config());
    t.extend(3);
    let backend = t.node.api_backend();

    let (latest_state, latest_header) = backend.state_and_header_by_number(BlockRef::Latest).unwrap().unwrap();
    let (pending_state, pending_header) = backend.state_and_header_by_number(BlockRef::Pending).unwrap().unwrap();
    let (head_state, head_header) = backend.state_and_header_by_number(BlockRef::Numbered(3)).unwrap().unwrap();

    assert_eq!(latest_header.number, 3);
    assert_eq!(pending_header.number, 4);
    assert_ne!(pending_header, latest_header);
    assert_ne!(pending_state, latest_state);
    assert_eq!(head_header, latest_header);
    assert_eq!(head_state, latest_state);
}

#[tokio::test]
async fn pending_storage_failure_is_an_error_not_absence() {
    let t = build(fake_config());
    t.chain_db().close();
    let backend = t.node.api_backend();

    assert!(matches!(
        backend.state_and_header_by_number(BlockRef::Pending),
        Err(BackendError::Miner(_))
    ));
    assert!(matches!(backend.header_by_number(BlockRef::Pending), Err(BackendError::Miner(_))));
    assert!(matches!(backend.block_by_number(BlockRef::Pending), Err(BackendError::Miner(_))));
}

#[tokio::test]
async fn numbered_past_head_is_not_found() {
    let t = build(fake_config());
    t.extend(2);
    let backend = t.node.api_backend();

    assert!(backend.header_by_number(BlockRef::Numbered(5)).unwrap().is_none());
    assert!(backend.block_by_number(BlockRef::Numbered(5)).unwrap().is_none());
    assert!(backend.state_and_header_by_number(BlockRef::Numbered(5)).unwrap().is_none());
}

#[tokio::test]
async fn evm_lifts_sender_balance() {
    let t = build(fake_config());
    let backend = t.node.api_backend();
    let (state, header) = backend.state_and_header_by_number(BlockRef::Latest).unwrap().unwrap();
    let pauper = Address::new([0xAB; 20]);
    assert!(state.get_balance(&pauper).is_zero());

    let msg = Message {
        from: pauper,
        to: Some(Address::new([0xCD; 20])),
        value: U256::from(1_000u64),
        gas: 50_000,
        gas_price: U256::from(1u64),
        ..Message::default()
    };
    let mut evm = backend.evm(&msg, state, &header, None).unwrap();
    let result = evm.call(&msg).unwrap();
    assert!(!result.failed);
    assert_eq!(evm.state().get_balance(&Address::new([0xCD; 20])), U256::from(1_000u64));
}

#[tokio::test]
async fn chain_extension_queries() {
    let t = build(fake_config());
    t.extend(2);
    let backend = t.node.api_backend();
    let genesis = backend.block_by_number(BlockRef::Numbered(0)).unwrap().unwrap();

    assert_eq!(backend.block_by_hash(&genesis.hash()).unwrap(), Some(genesis.clone()));
    assert!(backend.td(&genesis.hash()).unwrap().is_some());

    let unknown = Hash::digest(b"nowhere");
    assert!(backend.block_by_hash(&unknown).unwrap().is_none());
    assert!(backend.receipts(&unknown).unwrap().is_none());
    assert!(backend.logs(&unknown).unwrap().is_none());
    assert!(backend.td(&unknown).unwrap().is_none());
}

#[tokio::test]
async fn head_subscription_sees_new_blocks() {
    let t = build(fake_config());
    let mut heads = t.node.api_backend().subscribe_chain_head_event();
    t.extend(1);
    let event = heads.recv().await.unwrap();
    assert_eq!(event.block.number(), 1);
}

#[tokio::test]
async fn set_head_cancels_sync_first() {
    let t = build(fake_config());
    t.extend(3);
    t.node.api_backend().set_head(1).unwrap();
    assert_eq!(t.subsystems.protocol_manager().unwrap().sync_cancels(), 1);
    assert_eq!(t.subsystems.chain().unwrap().rewinds(), vec![1]);
    assert_eq!(t.node.api_backend().current_block().unwrap().number(), 1);
}

// ── Transaction pool bridge ─────────────────────────────────────────────

fn transfer(nonce: u64) -> Transaction {
    Transaction {
        nonce,
        gas_price: U256::from(20_000_000_000u64),
        gas: 21_000,
        to: Some(Address::new([9; 20])),
        value: U256::from(1u64),
        input: Vec::new(),
        from: NullWallet::address_of(&FUNDED_SEED),
    }
}

#[tokio::test]
async fn submitted_transactions_reach_the_pool() {
    let t = build(fake_config());
    let backend = t.node.api_backend();
    let sender = NullWallet::address_of(&FUNDED_SEED);
    let mut pre_events = backend.subscribe_tx_pre_event();

    backend.send_tx(transfer(0)).unwrap();
    backend.send_tx(transfer(1)).unwrap();
    backend.send_tx(transfer(5)).unwrap();

    assert_eq!(backend.pool_nonce(&sender).unwrap(), 2);
    assert_eq!(backend.stats().unwrap(), (2, 1));
    assert_eq!(backend.pool_transactions().unwrap().len(), 2);
    assert_eq!(backend.pool_transaction(&transfer(5).hash()).unwrap(), Some(transfer(5)));
    let (pending, queued) = backend.tx_pool_content().unwrap();
    assert_eq!(pending[&sender].len(), 2);
    assert_eq!(queued[&sender].len(), 1);
    assert_eq!(pre_events.recv().await.unwrap().tx, transfer(0));
    assert_eq!(t.node.metrics().transactions_submitted.get(), 3);

    assert!(matches!(
        backend.send_tx(transfer(0)),
        Err(BackendError::TxPool(_))
    ));
}

#[tokio::test]
async fn pending_block_carries_pool_transactions() {
    let t = build(fake_config());
    let backend = t.node.api_backend();
    backend.send_tx(transfer(0)).unwrap();
    let pending = backend.block_by_number(BlockRef::Pending).unwrap().unwrap();
    let latest = backend.block_by_number(BlockRef::Latest).unwrap().unwrap();
    assert_eq!(pending.transactions, vec![transfer(0)]);
    assert!(latest.transactions.is_empty());
}

#[tokio::test]
async fn suggested_price_falls_back_to_node_floor() {
    let config = NodeConfig {
        gas_price: U256::from(7u64),
        ..fake_config()
    };
    let t = build(config);
    t.extend(2);
    assert_eq!(t.node.api_backend().suggest_price().unwrap(), U256::from(7u64));
}

// ── Mining ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn coinbase_required_without_accounts() {
    let t = build(fake_config());
    assert!(matches!(t.node.mining().coinbase(), Err(NodeError::CoinbaseRequired)));
    assert!(matches!(t.node.mining().start_mining(true), Err(NodeError::CoinbaseRequired)));
    t.node.mining().join_pending().await;
    assert_eq!(t.subsystems.miner().unwrap().start_count(), 0);
}

#[tokio::test]
async fn coinbase_auto_selected_without_requery() {
    let t = build(fake_config());
    let wallet = Arc::new(NullWallet::single([3; 32]));
    t.accounts.add_wallet(wallet.clone());
    let expected = NullWallet::address_of(&[3; 32]);

    assert_eq!(t.node.mining().coinbase().unwrap(), expected);
    assert_eq!(wallet.account_queries(), 1);
    assert_eq!(t.node.mining().coinbase().unwrap(), expected);
    assert_eq!(wallet.account_queries(), 1);
}

#[tokio::test]
async fn fake_engine_local_mining_end_to_end() {
    let t = build(fake_config());
    let account = NullWallet::address_of(&[4; 32]);
    t.accounts.add_wallet(Arc::new(NullWallet::single([4; 32])));

    t.node.mining().start_mining(true).unwrap();
    t.node.mining().join_pending().await;

    assert_eq!(t.node.mining().coinbase().unwrap(), account);
    assert!(t.node.mining().is_mining());
    assert!(t.node.protocol_manager().accepts_txs());
    assert_eq!(t.subsystems.miner().unwrap().coinbase(), account);
    assert_eq!(t.node.metrics().mining_active.get(), 1);
}

fn clique_config(signer: Address) -> NodeConfig {
    let mut chain = ChainConfig::all_forks(1337);
    chain.clique = Some(CliqueConfig { period: 1, epoch: 0 });
    let mut genesis = private_genesis(chain);
    genesis.extra_data = genesis_extra(&[signer]);
    NodeConfig {
        genesis: Some(genesis),
        coinbase: Some(signer),
        ..fake_config()
    }
}

#[tokio::test]
async fn clique_without_local_signer_does_not_mine() {
    let signer = NullWallet::address_of(&[5; 32]);
    let t = build(clique_config(signer));
    assert_eq!(t.node.engine().name(), "clique");

    let result = t.node.mining().start_mining(false);
    assert!(matches!(result, Err(NodeError::SignerUnavailable(_))));
    t.node.mining().join_pending().await;
    assert_eq!(t.subsystems.miner().unwrap().start_count(), 0);
    assert!(!t.node.mining().is_mining());
}

#[tokio::test]
async fn clique_signer_is_authorized_from_wallet() {
    let signer = NullWallet::address_of(&[5; 32]);
    let t = build(clique_config(signer));
    let wallet = Arc::new(NullWallet::single([5; 32]));
    t.accounts.add_wallet(wallet.clone());

    t.node.mining().start_mining(false).unwrap();
    t.node.mining().join_pending().await;

    let clique = t.node.engine().clique().unwrap();
    assert_eq!(clique.signer(), Some(signer));
    assert!(clique.is_signer(&signer));
    assert_eq!(t.subsystems.miner().unwrap().start_count(), 1);
    assert!(!t.node.protocol_manager().accepts_txs());
}

// ── Lifecycle ───────────────────────────────────────────────────────────

#[tokio::test]
async fn light_peer_reservation() {
    let config = NodeConfig {
        light_serv: 25,
        light_peers: 20,
        ..fake_config()
    };
    let mut t = build(config.clone());
    assert!(matches!(
        t.node.start(20),
        Err(NodeError::InvalidPeerConfig { light_peers: 20, max_peers: 20 })
    ));
    t.node.stop().await.unwrap();

    let mut t = build(config);
    t.node.start(50).unwrap();
    assert_eq!(t.subsystems.protocol_manager().unwrap().started_with(), Some(30));
    t.node.stop().await.unwrap();

    let mut t = build(fake_config());
    t.node.start(20).unwrap();
    assert_eq!(t.subsystems.protocol_manager().unwrap().started_with(), Some(20));
    t.node.stop().await.unwrap();
}

#[tokio::test]
async fn les_server_joins_lifecycle() {
    let mut t = build(fake_config());
    let les = Arc::new(NullLesServer::new());
    t.node.add_les_server(les.clone());
    assert!(les.has_bloom_indexer());
    assert!(t.node.protocols().iter().any(|p| p.name == "les"));
    assert_eq!(t.node.protocol_version(), t.node.protocols()[0].version);

    t.node.start(50).unwrap();
    assert!(les.is_started());
    t.node.stop().await.unwrap();
    assert!(les.is_stopped());
}

#[tokio::test]
async fn stop_tears_everything_down() {
    let mut t = build(fake_config());
    t.accounts.add_wallet(Arc::new(NullWallet::single([4; 32])));
    t.node.start(25).unwrap();
    t.node.mining().start_mining(true).unwrap();

    t.node.stop().await.unwrap();

    assert!(t.node.is_stopped());
    assert!(t.subsystems.bloom_indexer().unwrap().is_closed());
    assert!(t.subsystems.chain().unwrap().is_stopped());
    assert!(t.subsystems.protocol_manager().unwrap().is_stopped());
    assert!(t.subsystems.tx_pool().unwrap().is_stopped());
    assert!(!t.subsystems.miner().unwrap().is_mining());
    assert!(t.node.event_mux().is_stopped());
    assert!(t.node.chain_db().is_closed());
    assert_eq!(t.node.metrics().mining_active.get(), 0);
}

#[tokio::test]
async fn stop_runs_producers_before_consumers() {
    let journal = CallJournal::new();
    let opener = Arc::new(NullDatabaseOpener::new().with_journal(journal.clone()));
    let subsystems = Arc::new(NullSubsystems::with_journal(journal.clone()));
    let ctx = ServiceContext::new(None, opener, Arc::new(Manager::default()), subsystems);
    let mut node = HucNode::new(&ctx, fake_config()).unwrap();
    node.add_les_server(Arc::new(NullLesServer::new().with_journal(journal.clone())));
    node.start(25).unwrap();

    let db = node.chain_db().clone();
    journal.watch("migration settled", move || {
        is_dedup_complete(db.as_ref()).unwrap_or(false)
    });
    let mux = node.event_mux().clone();
    journal.watch("event mux stopped", move || mux.is_stopped());

    node.stop().await.unwrap();

    assert_eq!(
        journal.entries(),
        vec![
            "migration settled",
            "bloom indexer closed",
            "blockchain stopped",
            "protocol manager stopped",
            "light server stopped",
            "transaction pool stopped",
            "miner stopped",
            "event mux stopped",
            "database closed",
        ]
    );
}

#[test]
fn queued_miner_launch_does_not_outlive_stop() {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .max_blocking_threads(1)
        .enable_all()
        .build()
        .unwrap();
    runtime.block_on(async {
        let mut t = build(fake_config());
        t.accounts.add_wallet(Arc::new(NullWallet::single([4; 32])));
        t.node.start(25).unwrap();

        // Occupy the only blocking thread so the launch stays queued.
        let busy = tokio::task::spawn_blocking(|| std::thread::sleep(std::time::Duration::from_millis(200)));
        t.node.mining().start_mining(true).unwrap();
        t.node.stop().await.unwrap();
        busy.await.unwrap();

        let miner = t.subsystems.miner().unwrap();
        assert!(!miner.is_mining());
        assert_eq!(miner.start_count(), 0);
        assert_eq!(miner.stop_count(), 1);
    });
}

#[tokio::test]
async fn queries_after_stop_fail_cleanly() {
    let mut t = build(fake_config());
    t.node.start(25).unwrap();
    t.node.stop().await.unwrap();
    let backend = t.node.api_backend();

    assert!(matches!(backend.header_by_number(BlockRef::Latest), Err(BackendError::Stopped)));
    assert!(matches!(backend.block_by_number(BlockRef::Pending), Err(BackendError::Stopped)));
    assert!(matches!(backend.send_tx(transfer(0)), Err(BackendError::Stopped)));
    assert!(matches!(backend.suggest_price(), Err(BackendError::Stopped)));
    assert!(!backend.subscribe_chain_event().is_active());
    let session = Arc::new(MatcherSession::new(vec![1], 0, 10));
    assert!(matches!(backend.service_filter(session), Err(BackendError::Stopped)));

    // A second stop is a no-op.
    t.node.stop().await.unwrap();
}

#[tokio::test]
async fn stop_without_start() {
    let mut t = build(fake_config());
    t.node.stop().await.unwrap();
    assert!(t.node.chain_db().is_closed());
}

// ── Bloom retrieval ─────────────────────────────────────────────────────

#[tokio::test]
async fn filter_session_is_served_by_bloom_handlers() {
    let mut t = build(fake_config());
    let db = t.chain_db();
    let section_head = Hash::digest(b"section 0");
    write_canonical_hash(db.as_ref(), &section_head, BLOOM_BITS_BLOCKS - 1).unwrap();
    let mut bits = vec![0u8; (BLOOM_BITS_BLOCKS / 8) as usize];
    bits[0] = 0b1010_0000;
    write_bloom_bits(db.as_ref(), 42, 0, &section_head, &bits).unwrap();

    t.node.start(25).unwrap();
    let filter = FilterApi::new(t.node.api_backend().clone());
    let matches = filter.matching_blocks(vec![42], 0, 10).await.unwrap();
    assert_eq!(matches, vec![0, 2]);
    assert!(t.node.metrics().bloom_requests.get() >= 1);
    assert_eq!(t.node.metrics().filter_sessions.get(), 1);

    let missing = filter.matching_blocks(vec![42], 0, 2 * BLOOM_BITS_BLOCKS - 1).await;
    assert!(matches!(missing, Err(BackendError::Filter(_))));
    t.node.stop().await.unwrap();
}

#[tokio::test]
async fn bloom_status_reports_indexed_sections() {
    let t = build(fake_config());
    assert_eq!(t.node.api_backend().bloom_status(), (BLOOM_BITS_BLOCKS, 0));
    t.subsystems.bloom_indexer().unwrap().set_min_sections(2);
    assert_eq!(t.node.api_backend().bloom_status(), (BLOOM_BITS_BLOCKS, 2));
    assert_eq!(t.subsystems.bloom_indexer().unwrap().sections().0, 2);
}

// ── RPC services ────────────────────────────────────────────────────────

#[tokio::test]
async fn net_api_appears_after_start() {
    let mut t = build(fake_config());
    let namespaces = |node: &HucNode| node.apis().iter().map(|a| a.namespace).collect::<Vec<_>>();
    assert!(!namespaces(&t.node).contains(&"net"));
    for ns in ["eth", "txpool", "miner", "admin", "debug"] {
        assert!(namespaces(&t.node).contains(&ns), "{ns}");
    }
    assert!(t.node.apis().iter().any(|a| matches!(a.service, RpcService::Engine(_))));

    t.node.start(25).unwrap();
    let net = t
        .node
        .apis()
        .into_iter()
        .find_map(|a| match a.service {
            RpcService::Net(net) => Some(net),
            _ => None,
        })
        .unwrap();
    assert_eq!(net.version(), "1337");
    assert!(net.listening());
    t.node.stop().await.unwrap();
}

#[tokio::test]
async fn private_miner_api_controls_mining() {
    let t = build(fake_config());
    t.accounts.add_wallet(Arc::new(NullWallet::single([4; 32])));
    let miner_api = t
        .node
        .apis()
        .into_iter()
        .find_map(|a| match a.service {
            RpcService::MinerControl(api) => Some(api),
            _ => None,
        })
        .unwrap();

    miner_api.start(Some(2)).unwrap();
    t.node.mining().join_pending().await;
    assert!(t.node.mining().is_mining());
    assert_eq!(t.node.engine().ethash().unwrap().threads(), 2);

    assert!(miner_api.stop());
    assert!(!t.node.mining().is_mining());
    assert_eq!(t.node.engine().ethash().unwrap().threads(), -1);

    assert!(miner_api.set_extra(&"x".repeat(40)).is_err());
    assert!(miner_api.set_gas_price(U256::from(3u64)));
    assert_eq!(t.node.mining().gas_price(), U256::from(3u64));
    assert_eq!(t.subsystems.tx_pool().unwrap().gas_price(), U256::from(3u64));
}

#[tokio::test]
async fn admin_exports_canonical_chain() {
    let t = build(fake_config());
    t.extend(3);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chain.jsonl");

    let admin = PrivateAdminApi::new(t.node.core().clone());
    assert_eq!(admin.export_chain(&path).unwrap(), 4);
    let lines = std::fs::read_to_string(&path).unwrap();
    assert_eq!(lines.lines().count(), 4);
}

#[tokio::test]
async fn debug_apis_read_state() {
    let t = build(fake_config());
    t.extend(2);
    let public = PublicDebugApi::new(t.node.api_backend().clone());
    let dump = public.dump_block(BlockRef::Numbered(0)).unwrap().unwrap();
    assert_eq!(
        dump[&NullWallet::address_of(&FUNDED_SEED)].balance,
        U256::from(1_000_000_000_000u64)
    );
    assert!(public.dump_block(BlockRef::Numbered(9)).unwrap().is_none());

    let private = PrivateDebugApi::new(t.node.api_backend().clone());
    // Each extension block credits the genesis coinbase.
    assert_eq!(private.modified_accounts_by_number(2, None).unwrap(), vec![Address::ZERO]);
    assert!(matches!(
        private.modified_accounts_by_number(2, Some(1)),
        Err(BackendError::InvalidRange { start: 2, end: 1 })
    ));
    assert!(matches!(
        private.modified_accounts_by_number(1, Some(7)),
        Err(BackendError::UnknownBlock(7))
    ));
}

#[tokio::test]
async fn reset_with_genesis_drops_chain() {
    let t = build(fake_config());
    t.extend(3);
    let genesis = t.node.blockchain().block_by_number(0).unwrap().unwrap();
    t.node.reset_with_genesis_block(genesis).unwrap();
    assert_eq!(t.node.blockchain().current_block().unwrap().number(), 0);
}

mod extra_data {
    use huc_node::make_extra_data;
    use huc_types::params::MAXIMUM_EXTRA_DATA_SIZE;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn fits_or_is_dropped(extra in proptest::collection::vec(any::<u8>(), 1..64)) {
            let out = make_extra_data(&extra);
            if extra.len() <= MAXIMUM_EXTRA_DATA_SIZE {
                prop_assert_eq!(out, extra);
            } else {
                prop_assert!(out.is_empty());
            }
        }
    }
}
