//! Nullable infrastructure for deterministic testing.
//!
//! Every collaborator the node composes (storage, chain, transaction pool,
//! miner, protocol layer, bloom indexer, light server, wallets) has an
//! in-memory implementation here that:
//! - Returns deterministic values
//! - Records what was asked of it so tests can assert on it
//! - Never touches the filesystem or network
//!
//! The daemon also runs on these in development mode.

pub mod chain;
pub mod journal;
pub mod miner;
pub mod protocol;
pub mod store;
pub mod subsystems;
pub mod txpool;
pub mod wallet;

pub use chain::NullChain;
pub use journal::CallJournal;
pub use miner::NullMiner;
pub use protocol::{NullBloomIndexer, NullLesServer, NullProtocolManager};
pub use store::{NullDatabase, NullDatabaseOpener};
pub use subsystems::NullSubsystems;
pub use txpool::NullTxPool;
pub use wallet::NullWallet;
