use huc_consensus::ConsensusError;
use huc_core::{AccountError, ChainError, CoreError, GenesisError, MinerError, TxPoolError};
use huc_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("can't run a full node in light sync mode, use a light client")]
    LightSyncUnsupported,

    #[error("invalid sync mode {0:?}")]
    InvalidSyncMode(String),

    #[error("blockchain DB version mismatch ({stored} / {expected}), run the database upgrade first")]
    SchemaVersionMismatch { stored: u32, expected: u32 },

    #[error("genesis error: {0}")]
    Genesis(#[from] GenesisError),

    #[error("consensus error: {0}")]
    Consensus(#[from] ConsensusError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("subsystem error: {0}")]
    Core(#[from] CoreError),

    #[error("chain error: {0}")]
    Chain(#[from] ChainError),

    #[error("miner error: {0}")]
    Miner(#[from] MinerError),

    #[error("coinbase must be explicitly specified")]
    CoinbaseRequired,

    #[error("signer missing: {0}")]
    SignerUnavailable(AccountError),

    #[error("invalid peer config: light peer count ({light_peers}) >= total peer count ({max_peers})")]
    InvalidPeerConfig { light_peers: usize, max_peers: usize },

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("shutdown timeout")]
    ShutdownTimeout,
}

/// Failure of a query answered by the API backend.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("node is stopped")]
    Stopped,

    #[error("chain error: {0}")]
    Chain(#[from] ChainError),

    #[error("tx pool error: {0}")]
    TxPool(#[from] TxPoolError),

    #[error("miner error: {0}")]
    Miner(#[from] MinerError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("log filter failed: {0}")]
    Filter(String),

    #[error("block #{0} not found")]
    UnknownBlock(u64),

    #[error("start block height ({start}) must be less than end block height ({end})")]
    InvalidRange { start: u64, end: u64 },
}
