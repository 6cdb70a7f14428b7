//! Key material used by local wallets and the proof-of-authority signer.

use zeroize::{Zeroize, ZeroizeOnDrop};

/// A 32-byte Ed25519 public key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PublicKey(pub [u8; 32]);

/// A 32-byte Ed25519 secret key.
///
/// Deliberately neither `Debug` nor `Clone`; zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey(pub [u8; 32]);

/// A 64-byte Ed25519 signature.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Signature(pub [u8; 64]);

/// An Ed25519 key pair.
pub struct KeyPair {
    pub public: PublicKey,
    pub private: PrivateKey,
}

/// A signature together with the key that produced it.
///
/// Ed25519 signatures cannot be used to recover the signer, so anything
/// that must later attribute a signature carries the public key alongside.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SignedHash {
    pub public_key: PublicKey,
    pub signature: Signature,
}

impl PublicKey {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl Signature {
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}
