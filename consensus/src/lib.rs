//! Consensus engines for the HappyUC node.
//!
//! ## Module overview
//!
//! - [`engine`] — the [`Engine`] capability set, [`ChainReader`], and the
//!   tagged [`ConsensusEngine`] chosen at startup.
//! - [`ethash`] — proof-of-work (normal, shared, test and fake modes).
//! - [`clique`] — proof-of-authority with signer authorization.
//! - [`selector`] — maps configuration to an engine.
//! - [`error`] — consensus error types.

pub mod clique;
pub mod engine;
pub mod error;
pub mod ethash;
pub mod selector;

#[cfg(test)]
mod testutil;

pub use clique::{Clique, CliqueApi, SignerFn};
pub use engine::{ChainReader, ConsensusEngine, Engine, EngineApi, EngineService};
pub use error::ConsensusError;
pub use ethash::{Ethash, EthashApi, EthashConfig, PowMode};
pub use selector::create_consensus_engine;
