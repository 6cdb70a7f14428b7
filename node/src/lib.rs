//! HappyUC full node — the composition root.
//!
//! The node:
//! - Opens chain storage and validates genesis and schema versions
//! - Selects the consensus engine
//! - Builds and owns the chain, transaction pool, miner and protocol layer
//! - Serves chain queries through the API backend
//! - Runs the bloom retrieval handlers for log searches
//! - Tears everything down in dependency order

pub mod api;
pub mod backend;
pub mod bloombits;
pub mod config;
pub mod context;
pub mod error;
pub mod gasprice;
pub mod logging;
pub mod metrics;
pub mod migration;
pub mod mining;
pub mod node;
pub mod shutdown;

pub use api::{RpcApi, RpcService};
pub use backend::ApiBackend;
pub use bloombits::{
    FilterWorkers, BLOOM_FILTER_THREADS, BLOOM_RETRIEVAL_BATCH, BLOOM_RETRIEVAL_WAIT,
    BLOOM_SERVICE_THREADS,
};
pub use config::NodeConfig;
pub use context::ServiceContext;
pub use error::{BackendError, NodeError};
pub use gasprice::{GpoConfig, Oracle};
pub use logging::{init_logging, LogFormat};
pub use metrics::NodeMetrics;
pub use migration::{MigrationOutcome, MigrationTask};
pub use mining::{MiningCoordinator, MiningParams};
pub use node::{make_extra_data, HucNode, NodeCore, SHUTDOWN_TIMEOUT};
pub use shutdown::ShutdownController;
