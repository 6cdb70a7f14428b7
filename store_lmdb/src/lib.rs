//! LMDB storage backend for the HappyUC node.
//!
//! Implements the `huc-store` [`Database`](huc_store::Database) contract
//! using the `heed` LMDB bindings. Each named database gets its own LMDB
//! environment directory under the opener's root.

pub mod database;
pub mod environment;
pub mod error;

pub use database::LmdbDatabase;
pub use environment::{LmdbEnvironment, LmdbOpener};
pub use error::LmdbError;
