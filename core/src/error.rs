use huc_consensus::ConsensusError;
use huc_store::StoreError;
use huc_types::{Address, Hash};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("missing trie node / state for root {0}")]
    MissingState(Hash),

    #[error("unknown block {0}")]
    UnknownBlock(Hash),

    #[error("no canonical head")]
    NoHead,

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("consensus error: {0}")]
    Consensus(#[from] ConsensusError),
}

#[derive(Debug, Error)]
pub enum TxPoolError {
    #[error("known transaction: {0}")]
    AlreadyKnown(Hash),

    #[error("nonce too low")]
    NonceTooLow,

    #[error("transaction underpriced")]
    Underpriced,

    #[error("insufficient funds for gas * price + value")]
    InsufficientFunds,

    #[error("transaction pool stopped")]
    Stopped,
}

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("unknown account {0}")]
    UnknownAccount(Address),

    #[error("account {0} is locked")]
    Locked(Address),

    #[error("signing failed: {0}")]
    SignFailed(String),
}

#[derive(Debug, Error)]
pub enum MinerError {
    #[error("extra data too long: {size} > {max}")]
    ExtraTooLong { size: usize, max: usize },

    #[error("pending block unavailable: {0}")]
    Chain(#[from] ChainError),

    #[error("pending transactions unavailable: {0}")]
    TxPool(#[from] TxPoolError),
}

#[derive(Debug, Error)]
pub enum GenesisError {
    #[error("database already contains an incompatible genesis block (have {stored}, new {new})")]
    Mismatch { stored: Hash, new: Hash },

    #[error("missing block number for head header hash")]
    MissingHeadNumber,

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Failure reported by a subsystem constructor or lifecycle call.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("chain: {0}")]
    Chain(#[from] ChainError),

    #[error("tx pool: {0}")]
    TxPool(#[from] TxPoolError),

    #[error("protocol: {0}")]
    Protocol(String),

    #[error("bloom indexer: {0}")]
    Indexer(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
