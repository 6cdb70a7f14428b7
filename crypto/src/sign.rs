//! Ed25519 signing and verification.

use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use huc_types::{Hash, PrivateKey, PublicKey, Signature, SignedHash};

/// Sign a message with a private key.
pub fn sign_message(message: &[u8], private_key: &PrivateKey) -> Signature {
    let signing_key = SigningKey::from_bytes(&private_key.0);
    Signature(signing_key.sign(message).to_bytes())
}

/// Sign a 32-byte hash, returning the signature with its public key.
pub fn sign_hash(hash: &Hash, private_key: &PrivateKey) -> SignedHash {
    let signing_key = SigningKey::from_bytes(&private_key.0);
    SignedHash {
        public_key: PublicKey(signing_key.verifying_key().to_bytes()),
        signature: Signature(signing_key.sign(hash.as_bytes()).to_bytes()),
    }
}

/// Verify a signature against a message and public key.
///
/// Returns `false` for malformed keys as well as bad signatures.
pub fn verify_signature(message: &[u8], signature: &Signature, public_key: &PublicKey) -> bool {
    let Ok(verifying_key) = VerifyingKey::from_bytes(&public_key.0) else {
        return false;
    };
    let sig = ed25519_dalek::Signature::from_bytes(&signature.0);
    verifying_key.verify(message, &sig).is_ok()
}
