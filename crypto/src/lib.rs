//! Cryptographic primitives for the HappyUC node.
//!
//! - **Ed25519** for wallet and proof-of-authority signatures
//! - **Blake2b** (from `huc-types`) for address derivation

pub mod address;
pub mod keys;
pub mod sign;

pub use address::derive_address;
pub use keys::{generate_keypair, keypair_from_seed, public_from_private};
pub use sign::{sign_hash, sign_message, verify_signature};
