//! The engine abstraction shared by every consensus variant.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use huc_store::StoreError;
use huc_types::{Address, Block, ChainConfig, Hash, Header, U256};

use crate::clique::{Clique, CliqueApi};
use crate::ethash::{Ethash, EthashApi};
use crate::ConsensusError;

/// Read access to the header chain, as needed during verification.
pub trait ChainReader: Send + Sync {
    fn config(&self) -> ChainConfig;

    fn current_header(&self) -> Result<Option<Header>, StoreError>;

    fn header(&self, hash: &Hash, number: u64) -> Result<Option<Header>, StoreError>;

    fn header_by_number(&self, number: u64) -> Result<Option<Header>, StoreError>;

    fn header_by_hash(&self, hash: &Hash) -> Result<Option<Header>, StoreError>;
}

/// Capabilities every consensus engine provides.
///
/// Signer authorization is deliberately absent: only proof-of-authority
/// needs it, and it is reached through [`ConsensusEngine::clique`].
pub trait Engine: Send + Sync {
    fn name(&self) -> &'static str;

    /// The account that sealed the header.
    fn author(&self, header: &Header) -> Result<Address, ConsensusError>;

    /// Check the header against its parent, then its seal.
    fn verify_header(&self, chain: &dyn ChainReader, header: &Header) -> Result<(), ConsensusError>;

    fn verify_seal(&self, chain: &dyn ChainReader, header: &Header) -> Result<(), ConsensusError>;

    /// Difficulty of a child of `parent` created at `time`.
    fn calc_difficulty(&self, chain: &dyn ChainReader, time: u64, parent: &Header) -> U256;

    fn block_reward(&self, config: &ChainConfig, header: &Header) -> U256;

    /// Produce a sealed version of `block`. Returns [`ConsensusError::SealAborted`]
    /// once `stop` is raised.
    fn seal(&self, chain: &dyn ChainReader, block: Block, stop: &AtomicBool) -> Result<Block, ConsensusError>;
}

/// Engine-specific RPC service.
#[derive(Clone)]
pub enum EngineService {
    Ethash(EthashApi),
    Clique(CliqueApi),
}

/// An RPC service group contributed by the engine.
#[derive(Clone)]
pub struct EngineApi {
    pub namespace: &'static str,
    pub version: &'static str,
    pub service: EngineService,
    pub public: bool,
}

/// The engine chosen at startup.
#[derive(Clone)]
pub enum ConsensusEngine {
    Ethash(Arc<Ethash>),
    Clique(Arc<Clique>),
}

impl ConsensusEngine {
    pub fn engine(&self) -> &dyn Engine {
        match self {
            ConsensusEngine::Ethash(e) => e.as_ref(),
            ConsensusEngine::Clique(c) => c.as_ref(),
        }
    }

    /// The proof-of-authority engine, when that is what was selected.
    pub fn clique(&self) -> Option<&Arc<Clique>> {
        match self {
            ConsensusEngine::Clique(c) => Some(c),
            ConsensusEngine::Ethash(_) => None,
        }
    }

    pub fn ethash(&self) -> Option<&Arc<Ethash>> {
        match self {
            ConsensusEngine::Ethash(e) => Some(e),
            ConsensusEngine::Clique(_) => None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.engine().name()
    }

    pub fn apis(&self) -> Vec<EngineApi> {
        match self {
            ConsensusEngine::Ethash(e) => vec![EngineApi {
                namespace: "eth",
                version: "1.0",
                service: EngineService::Ethash(EthashApi::new(e.clone())),
                public: true,
            }],
            ConsensusEngine::Clique(c) => vec![EngineApi {
                namespace: "clique",
                version: "1.0",
                service: EngineService::Clique(CliqueApi::new(c.clone())),
                public: false,
            }],
        }
    }
}

impl std::fmt::Debug for ConsensusEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ConsensusEngine").field(&self.name()).finish()
    }
}
