//! Genesis setup against stored chains.

use std::sync::Arc;

use huc_consensus::{ConsensusEngine, Ethash};
use huc_core::{setup_genesis_block, CacheConfig, Genesis, GenesisError, VmConfig};
use huc_nullables::{NullChain, NullDatabase};
use huc_store::meta::read_chain_config;
use huc_store::schema::config_key;
use huc_store::Database;
use huc_types::ChainConfig;

fn private_genesis() -> Genesis {
    let mut config = ChainConfig::all_forks(1337);
    config.byzantium_block = Some(10);
    let mut genesis = Genesis::with_config(config);
    genesis.extra_data = b"private".to_vec();
    genesis
}

fn chain_on(db: Arc<NullDatabase>, config: ChainConfig) -> NullChain {
    NullChain::new(
        db,
        config,
        ConsensusEngine::Ethash(Arc::new(Ethash::new_faker())),
        CacheConfig::default(),
        VmConfig::default(),
    )
    .unwrap()
}

#[test]
fn empty_database_commits_supplied_genesis() {
    let db = NullDatabase::new();
    let genesis = private_genesis();
    let (config, hash, compat) = setup_genesis_block(&db, Some(&genesis)).unwrap();

    assert_eq!(config, genesis.config);
    assert_eq!(hash, genesis.hash());
    assert!(compat.is_none());
    assert_eq!(read_chain_config(&db, &hash).unwrap(), Some(genesis.config));
}

#[test]
fn empty_database_defaults_to_mainnet() {
    let db = NullDatabase::new();
    let (config, hash, _) = setup_genesis_block(&db, None).unwrap();
    assert_eq!(config, ChainConfig::mainnet());
    assert_eq!(hash, Genesis::mainnet().hash());
}

#[test]
fn different_genesis_is_rejected() {
    let db = NullDatabase::new();
    setup_genesis_block(&db, Some(&private_genesis())).unwrap();

    let mut other = private_genesis();
    other.extra_data = b"other".to_vec();
    let err = setup_genesis_block(&db, Some(&other)).unwrap_err();
    assert!(matches!(err, GenesisError::Mismatch { .. }));
}

#[test]
fn missing_config_is_written() {
    let db = NullDatabase::new();
    let genesis = private_genesis();
    let block = genesis.commit(&db).unwrap();
    db.delete(&config_key(&block.hash())).unwrap();

    let (config, _, compat) = setup_genesis_block(&db, Some(&genesis)).unwrap();
    assert!(compat.is_none());
    assert_eq!(read_chain_config(&db, &block.hash()).unwrap(), Some(config));
}

#[test]
fn private_chain_keeps_stored_config() {
    let db = NullDatabase::new();
    let genesis = private_genesis();
    setup_genesis_block(&db, Some(&genesis)).unwrap();

    let (config, _, compat) = setup_genesis_block(&db, None).unwrap();
    assert_eq!(config, genesis.config);
    assert!(compat.is_none());
}

#[test]
fn incompatible_fork_past_head_requests_rewind() {
    let db = Arc::new(NullDatabase::new());
    let genesis = private_genesis();
    setup_genesis_block(db.as_ref(), Some(&genesis)).unwrap();
    chain_on(db.clone(), genesis.config.clone()).extend(20).unwrap();

    let mut moved = genesis.clone();
    moved.config.byzantium_block = Some(5);
    let (config, hash, compat) = setup_genesis_block(db.as_ref(), Some(&moved)).unwrap();

    let compat = compat.unwrap();
    assert_eq!(compat.rewind_to, 4);
    assert_eq!(config, moved.config);
    // Not persisted until the caller has rewound.
    assert_eq!(read_chain_config(db.as_ref(), &hash).unwrap(), Some(genesis.config));
}

#[test]
fn incompatible_fork_at_genesis_height_is_written() {
    let db = NullDatabase::new();
    let genesis = private_genesis();
    setup_genesis_block(&db, Some(&genesis)).unwrap();

    let mut moved = genesis.clone();
    moved.config.byzantium_block = Some(0);
    let (_, hash, compat) = setup_genesis_block(&db, Some(&moved)).unwrap();
    assert!(compat.is_none());
    assert_eq!(read_chain_config(&db, &hash).unwrap(), Some(moved.config));
}

#[test]
fn compatible_change_is_persisted() {
    let db = Arc::new(NullDatabase::new());
    let genesis = private_genesis();
    setup_genesis_block(db.as_ref(), Some(&genesis)).unwrap();
    chain_on(db.clone(), genesis.config.clone()).extend(3).unwrap();

    let mut later = genesis.clone();
    later.config.byzantium_block = Some(50);
    let (_, hash, compat) = setup_genesis_block(db.as_ref(), Some(&later)).unwrap();
    assert!(compat.is_none());
    assert_eq!(read_chain_config(db.as_ref(), &hash).unwrap(), Some(later.config));
}
