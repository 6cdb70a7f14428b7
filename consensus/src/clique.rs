//! Proof-of-authority engine.
//!
//! Blocks are sealed by one of a fixed set of authorized signers. A sealed
//! header's extra data ends with the signer's public key and its signature
//! over the seal hash:
//!
//! ```text
//! | vanity (32) | [genesis only: signers, 20 each] | public key (32) | signature (64) |
//! ```
//!
//! Ed25519 cannot recover a key from a signature, so the key is carried in
//! the seal and the author is derived from it.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use huc_crypto::{derive_address, verify_signature};
use huc_store::chain::{read_canonical_hash, read_header};
use huc_store::Database;
use huc_types::chain_config::DEFAULT_CLIQUE_EPOCH;
use huc_types::{Address, Block, ChainConfig, CliqueConfig, Hash, Header, PublicKey, Signature, SignedHash, U256};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::{ChainReader, ConsensusError, Engine};

/// Fixed number of extra-data prefix bytes reserved for signer vanity.
pub const EXTRA_VANITY: usize = 32;

/// Suffix bytes reserved for the seal: public key plus signature.
pub const EXTRA_SEAL: usize = 32 + 64;

pub const DIFF_IN_TURN: u64 = 2;
pub const DIFF_NO_TURN: u64 = 1;

const SNAPSHOT_KEY: &[u8] = b"clique-signers";

/// Signs a seal hash on behalf of the authorized signer.
pub type SignerFn = Arc<dyn Fn(&Hash) -> Result<SignedHash, ConsensusError> + Send + Sync>;

/// The authorized signer set at a given block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub number: u64,
    pub hash: Hash,
    pub signers: BTreeSet<Address>,
}

/// Build genesis extra data listing the initial signers.
pub fn genesis_extra(signers: &[Address]) -> Vec<u8> {
    let mut extra = vec![0u8; EXTRA_VANITY];
    for signer in signers {
        extra.extend_from_slice(signer.as_bytes());
    }
    extra.extend_from_slice(&[0u8; EXTRA_SEAL]);
    extra
}

fn signers_from_genesis(header: &Header) -> Result<BTreeSet<Address>, ConsensusError> {
    let extra = &header.extra;
    if extra.len() < EXTRA_VANITY + EXTRA_SEAL {
        return Err(ConsensusError::CorruptSnapshot(
            "genesis extra-data shorter than vanity and seal".into(),
        ));
    }
    let list = &extra[EXTRA_VANITY..extra.len() - EXTRA_SEAL];
    if list.len() % Address::LEN != 0 {
        return Err(ConsensusError::CorruptSnapshot(
            "genesis signer list is not a whole number of addresses".into(),
        ));
    }
    list.chunks(Address::LEN)
        .map(|chunk| Address::from_slice(chunk).map_err(|e| ConsensusError::CorruptSnapshot(e.to_string())))
        .collect()
}

struct Authorized {
    signer: Address,
    sign_fn: SignerFn,
}

/// The proof-of-authority engine.
pub struct Clique {
    config: CliqueConfig,
    snapshot: RwLock<Snapshot>,
    authorized: RwLock<Option<Authorized>>,
}

impl Clique {
    /// Load the signer set from `db`: a stored snapshot if present, else the
    /// signers listed in the genesis header, else an empty set.
    pub fn new(config: CliqueConfig, db: Arc<dyn Database>) -> Result<Self, ConsensusError> {
        let mut config = config;
        if config.epoch == 0 {
            config.epoch = DEFAULT_CLIQUE_EPOCH;
        }

        let snapshot = match db.get(SNAPSHOT_KEY)? {
            Some(bytes) => bincode::deserialize::<Snapshot>(&bytes)
                .map_err(|e| ConsensusError::CorruptSnapshot(e.to_string()))?,
            None => {
                let genesis = match read_canonical_hash(db.as_ref(), 0)? {
                    Some(hash) => read_header(db.as_ref(), &hash, 0)?,
                    None => None,
                };
                let snapshot = match genesis {
                    Some(header) => Snapshot {
                        number: 0,
                        hash: header.hash(),
                        signers: signers_from_genesis(&header)?,
                    },
                    None => Snapshot {
                        number: 0,
                        hash: Hash::ZERO,
                        signers: BTreeSet::new(),
                    },
                };
                let bytes = bincode::serialize(&snapshot)
                    .map_err(|e| ConsensusError::CorruptSnapshot(e.to_string()))?;
                db.put(SNAPSHOT_KEY, &bytes)?;
                snapshot
            }
        };

        tracing::info!(
            signers = snapshot.signers.len(),
            period = config.period,
            epoch = config.epoch,
            "loaded proof-of-authority signer set"
        );

        Ok(Self {
            config,
            snapshot: RwLock::new(snapshot),
            authorized: RwLock::new(None),
        })
    }

    pub fn config(&self) -> &CliqueConfig {
        &self.config
    }

    /// Inject the local signer used when sealing.
    pub fn authorize(&self, signer: Address, sign_fn: SignerFn) {
        tracing::info!(signer = %signer, "proof-of-authority signer authorized");
        *self.authorized.write() = Some(Authorized { signer, sign_fn });
    }

    /// The locally authorized signer, if any.
    pub fn signer(&self) -> Option<Address> {
        self.authorized.read().as_ref().map(|a| a.signer)
    }

    /// The authorized signer set in ascending order.
    pub fn signers(&self) -> Vec<Address> {
        self.snapshot.read().signers.iter().copied().collect()
    }

    pub fn is_signer(&self, address: &Address) -> bool {
        self.snapshot.read().signers.contains(address)
    }

    /// Whether `signer` is the designated signer for block `number`.
    pub fn in_turn(&self, number: u64, signer: &Address) -> bool {
        let snapshot = self.snapshot.read();
        let len = snapshot.signers.len() as u64;
        if len == 0 {
            return false;
        }
        snapshot.signers.iter().nth((number % len) as usize) == Some(signer)
    }

    fn seal_hash(header: &Header) -> Result<Hash, ConsensusError> {
        let len = header.extra.len();
        if len < EXTRA_VANITY + EXTRA_SEAL {
            return Err(ConsensusError::MissingSignature);
        }
        Ok(header.hash_with(&header.extra[..len - EXTRA_SEAL], &header.mix_digest, header.nonce))
    }

    fn difficulty_for(&self, number: u64, signer: &Address) -> U256 {
        if self.in_turn(number, signer) {
            U256::from(DIFF_IN_TURN)
        } else {
            U256::from(DIFF_NO_TURN)
        }
    }
}

impl Engine for Clique {
    fn name(&self) -> &'static str {
        "clique"
    }

    fn author(&self, header: &Header) -> Result<Address, ConsensusError> {
        let seal_hash = Self::seal_hash(header)?;
        let len = header.extra.len();
        let mut key = [0u8; 32];
        key.copy_from_slice(&header.extra[len - EXTRA_SEAL..len - 64]);
        let mut sig = [0u8; 64];
        sig.copy_from_slice(&header.extra[len - 64..]);
        let public_key = PublicKey(key);
        if !verify_signature(seal_hash.as_bytes(), &Signature(sig), &public_key) {
            return Err(ConsensusError::InvalidSignature);
        }
        Ok(derive_address(&public_key))
    }

    fn verify_header(&self, chain: &dyn ChainReader, header: &Header) -> Result<(), ConsensusError> {
        if header.number == 0 {
            return Ok(());
        }
        if header.extra.len() < EXTRA_VANITY + EXTRA_SEAL {
            return Err(ConsensusError::MissingSignature);
        }
        let parent = chain
            .header(&header.parent_hash, header.number - 1)?
            .ok_or(ConsensusError::UnknownAncestor(header.parent_hash))?;
        if header.time < parent.time.saturating_add(self.config.period) {
            return Err(ConsensusError::InvalidTimestamp);
        }
        self.verify_seal(chain, header)
    }

    fn verify_seal(&self, _chain: &dyn ChainReader, header: &Header) -> Result<(), ConsensusError> {
        if header.number == 0 {
            return Ok(());
        }
        let signer = self.author(header)?;
        if !self.is_signer(&signer) {
            return Err(ConsensusError::UnauthorizedSigner(signer));
        }
        let want = self.difficulty_for(header.number, &signer);
        if header.difficulty != want {
            return Err(ConsensusError::InvalidDifficulty {
                have: header.difficulty,
                want,
            });
        }
        Ok(())
    }

    fn calc_difficulty(&self, _chain: &dyn ChainReader, _time: u64, parent: &Header) -> U256 {
        match self.signer() {
            Some(signer) => self.difficulty_for(parent.number + 1, &signer),
            None => U256::from(DIFF_NO_TURN),
        }
    }

    fn block_reward(&self, _config: &ChainConfig, _header: &Header) -> U256 {
        U256::zero()
    }

    fn seal(&self, _chain: &dyn ChainReader, block: Block, stop: &AtomicBool) -> Result<Block, ConsensusError> {
        let (signer, sign_fn) = {
            let guard = self.authorized.read();
            let authorized = guard.as_ref().ok_or(ConsensusError::NotAuthorized)?;
            (authorized.signer, authorized.sign_fn.clone())
        };
        if !self.is_signer(&signer) {
            return Err(ConsensusError::UnauthorizedSigner(signer));
        }
        if stop.load(Ordering::Relaxed) {
            return Err(ConsensusError::SealAborted);
        }

        let mut header = block.header.clone();
        let mut vanity = header.extra.clone();
        vanity.resize(EXTRA_VANITY, 0);
        let seal_hash = header.hash_with(&vanity, &header.mix_digest, header.nonce);

        let signed = sign_fn(&seal_hash)?;
        if derive_address(&signed.public_key) != signer {
            return Err(ConsensusError::SignFailed(
                "signing key does not belong to the authorized signer".into(),
            ));
        }

        vanity.extend_from_slice(signed.public_key.as_bytes());
        vanity.extend_from_slice(signed.signature.as_bytes());
        header.extra = vanity;
        Ok(block.with_seal(header))
    }
}

/// RPC service over the proof-of-authority engine.
#[derive(Clone)]
pub struct CliqueApi {
    clique: Arc<Clique>,
}

impl CliqueApi {
    pub fn new(clique: Arc<Clique>) -> Self {
        Self { clique }
    }

    pub fn get_signers(&self) -> Vec<Address> {
        self.clique.signers()
    }

    pub fn get_local_signer(&self) -> Option<Address> {
        self.clique.signer()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{MemChain, MemDb};
    use huc_crypto::{keypair_from_seed, sign_hash};
    use huc_store::chain::{write_block, write_canonical_hash};
    use huc_types::KeyPair;

    fn signer_fn(seed: [u8; 32]) -> SignerFn {
        Arc::new(move |hash: &Hash| {
            let kp = keypair_from_seed(&seed);
            Ok(sign_hash(hash, &kp.private))
        })
    }

    fn db_with_signers(signers: &[Address]) -> Arc<MemDb> {
        let db = Arc::new(MemDb::default());
        let genesis = Block::new(
            Header {
                extra: genesis_extra(signers),
                ..Default::default()
            },
            Vec::new(),
        );
        write_block(db.as_ref(), &genesis).unwrap();
        write_canonical_hash(db.as_ref(), &genesis.hash(), 0).unwrap();
        db
    }

    fn key(seed: u8) -> (KeyPair, Address) {
        let kp = keypair_from_seed(&[seed; 32]);
        let addr = derive_address(&kp.public);
        (kp, addr)
    }

    #[test]
    fn signers_loaded_from_genesis() {
        let (_, a) = key(1);
        let (_, b) = key(2);
        let clique = Clique::new(CliqueConfig { period: 0, epoch: 0 }, db_with_signers(&[a, b])).unwrap();
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(clique.signers(), expected);
        assert_eq!(clique.config().epoch, DEFAULT_CLIQUE_EPOCH);
    }

    #[test]
    fn corrupt_snapshot_is_error() {
        let db = Arc::new(MemDb::default());
        db.put(SNAPSHOT_KEY, &[0xFF, 0x01]).unwrap();
        assert!(matches!(
            Clique::new(CliqueConfig { period: 0, epoch: 0 }, db),
            Err(ConsensusError::CorruptSnapshot(_))
        ));
    }

    #[test]
    fn seal_requires_authorization() {
        let (_, a) = key(1);
        let clique = Clique::new(CliqueConfig { period: 0, epoch: 0 }, db_with_signers(&[a])).unwrap();
        let chain = MemChain::with_genesis();
        let stop = AtomicBool::new(false);
        assert!(matches!(
            clique.seal(&chain, Block::default(), &stop),
            Err(ConsensusError::NotAuthorized)
        ));
    }

    #[test]
    fn sealed_header_verifies_and_reveals_author() {
        let (_, a) = key(1);
        let db = db_with_signers(&[a]);
        let clique = Clique::new(CliqueConfig { period: 0, epoch: 0 }, db).unwrap();
        clique.authorize(a, signer_fn([1; 32]));

        let chain = MemChain::with_genesis();
        let parent = chain.genesis();
        let header = Header {
            parent_hash: parent.hash(),
            number: 1,
            time: parent.time + 1,
            difficulty: clique.calc_difficulty(&chain, parent.time + 1, &parent),
            ..Default::default()
        };
        assert_eq!(header.difficulty, U256::from(DIFF_IN_TURN));

        let stop = AtomicBool::new(false);
        let sealed = clique.seal(&chain, Block::new(header, Vec::new()), &stop).unwrap();
        assert_eq!(sealed.header().extra.len(), EXTRA_VANITY + EXTRA_SEAL);
        assert_eq!(clique.author(sealed.header()).unwrap(), a);
        clique.verify_header(&chain, sealed.header()).unwrap();
    }

    #[test]
    fn outsider_cannot_seal() {
        let (_, a) = key(1);
        let (_, outsider) = key(9);
        let clique = Clique::new(CliqueConfig { period: 0, epoch: 0 }, db_with_signers(&[a])).unwrap();
        clique.authorize(outsider, signer_fn([9; 32]));
        let chain = MemChain::with_genesis();
        let stop = AtomicBool::new(false);
        assert!(matches!(
            clique.seal(&chain, Block::default(), &stop),
            Err(ConsensusError::UnauthorizedSigner(addr)) if addr == outsider
        ));
    }

    #[test]
    fn mismatched_signing_key_rejected() {
        let (_, a) = key(1);
        let clique = Clique::new(CliqueConfig { period: 0, epoch: 0 }, db_with_signers(&[a])).unwrap();
        clique.authorize(a, signer_fn([2; 32]));
        let chain = MemChain::with_genesis();
        let stop = AtomicBool::new(false);
        assert!(matches!(
            clique.seal(&chain, Block::default(), &stop),
            Err(ConsensusError::SignFailed(_))
        ));
    }

    #[test]
    fn turn_rotates_through_sorted_signers() {
        let (_, a) = key(1);
        let (_, b) = key(2);
        let clique = Clique::new(CliqueConfig { period: 0, epoch: 0 }, db_with_signers(&[a, b])).unwrap();
        let sorted = clique.signers();
        assert!(clique.in_turn(0, &sorted[0]));
        assert!(clique.in_turn(1, &sorted[1]));
        assert!(!clique.in_turn(1, &sorted[0]));
    }

    #[test]
    fn unsealed_header_has_no_author() {
        let (_, a) = key(1);
        let clique = Clique::new(CliqueConfig { period: 0, epoch: 0 }, db_with_signers(&[a])).unwrap();
        assert!(matches!(
            clique.author(&Header::default()),
            Err(ConsensusError::MissingSignature)
        ));
    }
}
