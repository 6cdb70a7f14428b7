//! Fundamental types for the HappyUC node.
//!
//! This crate defines the primitives shared across every other crate in the
//! workspace: addresses, hashes, headers and blocks, transactions and
//! receipts, abstract block references, chain configuration and the
//! compatibility rules between two configurations.

pub mod address;
pub mod block;
pub mod block_ref;
pub mod chain_config;
pub mod error;
pub mod hash;
pub mod keys;
pub mod params;
pub mod sync_mode;
pub mod transaction;

pub use address::Address;
pub use block::{Block, Header};
pub use block_ref::BlockRef;
pub use chain_config::{ChainConfig, CliqueConfig, ConfigCompatError};
pub use error::TypesError;
pub use hash::{blake2b_256, Hash};
pub use keys::{KeyPair, PrivateKey, PublicKey, Signature, SignedHash};
pub use primitive_types::U256;
pub use sync_mode::SyncMode;
pub use transaction::{Log, Receipt, Transaction};
