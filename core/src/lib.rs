//! Interfaces between the node and the subsystems it composes.
//!
//! The node never depends on a concrete chain, pool, miner or protocol
//! implementation. It is handed a [`SubsystemBuilder`] and talks to what it
//! builds through the traits defined here. Shared plumbing that every
//! implementation needs (event feeds, state snapshots, genesis handling,
//! bloom retrieval scheduling) lives here as concrete code.

pub mod accounts;
pub mod bloombits;
pub mod builder;
pub mod chain;
pub mod error;
pub mod event;
pub mod genesis;
pub mod miner;
pub mod protocol;
pub mod state;
pub mod txpool;
pub mod vm;

pub use accounts::{Account, Manager, Wallet};
pub use bloombits::{multiplex, BloomIndexer, BloomRequest, MatcherSession, Retrieval};
pub use builder::{ProtocolManagerArgs, SubsystemBuilder};
pub use chain::{BlockChain, CacheConfig};
pub use error::{AccountError, ChainError, CoreError, GenesisError, MinerError, TxPoolError};
pub use event::{
    ChainEvent, ChainHeadEvent, ChainSideEvent, EventMux, Feed, MuxEvent, RemovedLogsEvent,
    Subscription, TxPreEvent,
};
pub use genesis::{setup_genesis_block, Genesis, GenesisAccount};
pub use miner::Miner;
pub use protocol::{LesServer, Protocol, ProtocolManager, SyncProgress};
pub use state::{AccountState, StateDb};
pub use txpool::{PoolContent, TxPool, TxPoolConfig};
pub use vm::{Evm, EvmContext, ExecutionResult, Message, VmConfig, VmError};
