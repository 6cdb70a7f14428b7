//! Address derivation from public keys.

use huc_types::{blake2b_256, Address, PublicKey};

/// Derive an account address: the last 20 bytes of the Blake2b-256 digest
/// of the public key.
pub fn derive_address(public_key: &PublicKey) -> Address {
    let digest = blake2b_256(&[public_key.as_bytes()]);
    let mut out = [0u8; 20];
    out.copy_from_slice(&digest[12..]);
    Address::new(out)
}
