//! Genesis block construction and chain configuration setup.

use std::collections::BTreeMap;

use huc_store::chain::{
    read_canonical_hash, read_head_number, write_block, write_canonical_hash,
    write_head_block_hash, write_td,
};
use huc_store::meta::{read_chain_config, write_chain_config};
use huc_store::Database;
use huc_types::params::{GENESIS_DIFFICULTY, GENESIS_GAS_LIMIT};
use huc_types::{Address, Block, ChainConfig, ConfigCompatError, Hash, Header, U256};
use serde::{Deserialize, Serialize};

use crate::state::StateDb;
use crate::GenesisError;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisAccount {
    pub balance: U256,
    #[serde(default)]
    pub nonce: u64,
}

/// Specification of a chain's first block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genesis {
    pub config: ChainConfig,
    #[serde(default)]
    pub nonce: u64,
    #[serde(default)]
    pub timestamp: u64,
    #[serde(default)]
    pub extra_data: Vec<u8>,
    #[serde(default = "default_gas_limit")]
    pub gas_limit: u64,
    #[serde(default = "default_difficulty")]
    pub difficulty: U256,
    #[serde(default)]
    pub mix_hash: Hash,
    #[serde(default)]
    pub coinbase: Address,
    #[serde(default)]
    pub alloc: BTreeMap<Address, GenesisAccount>,
}

fn default_gas_limit() -> u64 {
    GENESIS_GAS_LIMIT
}

fn default_difficulty() -> U256 {
    U256::from(GENESIS_DIFFICULTY)
}

impl Genesis {
    /// The main network genesis.
    pub fn mainnet() -> Self {
        Self {
            config: ChainConfig::mainnet(),
            nonce: 66,
            timestamp: 0,
            extra_data: b"HappyUC main network".to_vec(),
            gas_limit: 5000,
            difficulty: U256::from(17_179_869_184u64),
            mix_hash: Hash::ZERO,
            coinbase: Address::ZERO,
            alloc: BTreeMap::new(),
        }
    }

    /// A genesis with the given configuration and otherwise default fields.
    pub fn with_config(config: ChainConfig) -> Self {
        Self {
            config,
            nonce: 0,
            timestamp: 0,
            extra_data: Vec::new(),
            gas_limit: default_gas_limit(),
            difficulty: default_difficulty(),
            mix_hash: Hash::ZERO,
            coinbase: Address::ZERO,
            alloc: BTreeMap::new(),
        }
    }

    fn state(&self) -> StateDb {
        let mut state = StateDb::new();
        for (address, account) in &self.alloc {
            state.set_balance(*address, account.balance);
            state.set_nonce(*address, account.nonce);
        }
        state
    }

    /// The genesis block and its state, without writing anything.
    pub fn to_block(&self) -> (Block, StateDb) {
        let state = self.state();
        let header = Header {
            number: 0,
            nonce: self.nonce,
            time: self.timestamp,
            extra: self.extra_data.clone(),
            gas_limit: self.gas_limit,
            difficulty: if self.difficulty.is_zero() {
                default_difficulty()
            } else {
                self.difficulty
            },
            mix_digest: self.mix_hash,
            coinbase: self.coinbase,
            root: state.root(),
            ..Header::default()
        };
        (Block::new(header, Vec::new()), state)
    }

    pub fn hash(&self) -> Hash {
        self.to_block().0.hash()
    }

    /// Write the genesis block, its state and configuration as the head of
    /// an empty chain.
    pub fn commit(&self, db: &dyn Database) -> Result<Block, GenesisError> {
        let (block, state) = self.to_block();
        let hash = block.hash();
        state.commit(db)?;
        write_td(db, &hash, 0, &block.header.difficulty)?;
        write_block(db, &block)?;
        write_canonical_hash(db, &hash, 0)?;
        write_head_block_hash(db, &hash)?;
        write_chain_config(db, &hash, &self.config)?;
        Ok(block)
    }
}

/// Establish the chain configuration for `db`.
///
/// On an empty database `genesis` (or the main network genesis) is
/// committed. Otherwise a supplied genesis must match the stored one, and
/// its configuration is checked against the stored configuration at the
/// current head. An incompatibility that requires rewinding processed
/// blocks is returned alongside the new configuration instead of being
/// written; the caller rewinds and persists it.
pub fn setup_genesis_block(
    db: &dyn Database,
    genesis: Option<&Genesis>,
) -> Result<(ChainConfig, Hash, Option<ConfigCompatError>), GenesisError> {
    let Some(stored) = read_canonical_hash(db, 0)? else {
        let genesis = match genesis {
            Some(g) => {
                tracing::info!("Writing custom genesis block");
                g.clone()
            }
            None => {
                tracing::info!("Writing default main-net genesis block");
                Genesis::mainnet()
            }
        };
        let block = genesis.commit(db)?;
        return Ok((genesis.config, block.hash(), None));
    };

    if let Some(g) = genesis {
        let new = g.hash();
        if new != stored {
            return Err(GenesisError::Mismatch { stored, new });
        }
    }

    let mainnet_hash = Genesis::mainnet().hash();
    let new_config = match genesis {
        Some(g) => g.config.clone(),
        None if stored == mainnet_hash => ChainConfig::mainnet(),
        None => ChainConfig::all_forks(ChainConfig::mainnet().chain_id),
    };

    let Some(stored_config) = read_chain_config(db, &stored)? else {
        tracing::warn!(genesis = %stored, "Found genesis block without chain config");
        write_chain_config(db, &stored, &new_config)?;
        return Ok((new_config, stored, None));
    };

    // A private chain keeps its stored config unless a new one is supplied.
    if genesis.is_none() && stored != mainnet_hash {
        return Ok((stored_config, stored, None));
    }

    let height = read_head_number(db)?.ok_or(GenesisError::MissingHeadNumber)?;
    if let Err(compat) = stored_config.check_compatible(&new_config, height) {
        if height != 0 && compat.rewind_to != 0 {
            return Ok((new_config, stored, Some(compat)));
        }
    }
    write_chain_config(db, &stored, &new_config)?;
    Ok((new_config, stored, None))
}
