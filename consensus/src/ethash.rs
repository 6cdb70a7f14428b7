//! Proof-of-work engine.
//!
//! A header's proof-of-work is the Blake2b-256 digest of its seal hash
//! (the header hash with the nonce and mix digest zeroed) followed by the
//! nonce. The digest, read as a big-endian integer, must not exceed
//! `2^256 / difficulty`.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use huc_types::params::MINIMUM_DIFFICULTY;
use huc_types::{blake2b_256, Address, Block, ChainConfig, Hash, Header, U256};
use parking_lot::RwLock;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{ChainReader, ConsensusError, Engine};

/// Nonces tried per thread before the stop flag is checked.
const BATCH_SIZE: u64 = 4096;

/// Parent-relative difficulty adjustment step (1/2048 of the parent).
const DIFFICULTY_BOUND_DIVISOR: u64 = 2048;

/// Target seconds between blocks; each multiple above lowers difficulty.
const DURATION_LIMIT: u64 = 10;

const FRONTIER_BLOCK_REWARD: u128 = 5_000_000_000_000_000_000;
const BYZANTIUM_BLOCK_REWARD: u128 = 3_000_000_000_000_000_000;

/// Operating mode of the proof-of-work engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowMode {
    #[default]
    Normal,
    Shared,
    Test,
    Fake,
}

impl std::fmt::Display for PowMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PowMode::Normal => "normal",
            PowMode::Shared => "shared",
            PowMode::Test => "test",
            PowMode::Fake => "fake",
        };
        f.write_str(s)
    }
}

/// Proof-of-work configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EthashConfig {
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    #[serde(default = "default_caches_in_mem")]
    pub caches_in_mem: usize,
    #[serde(default = "default_caches_on_disk")]
    pub caches_on_disk: usize,
    #[serde(default = "default_dataset_dir")]
    pub dataset_dir: PathBuf,
    #[serde(default = "default_datasets_in_mem")]
    pub datasets_in_mem: usize,
    #[serde(default = "default_datasets_on_disk")]
    pub datasets_on_disk: usize,
    #[serde(default)]
    pub pow_mode: PowMode,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_cache_dir() -> PathBuf {
    PathBuf::from("ethash")
}
fn default_caches_in_mem() -> usize {
    2
}
fn default_caches_on_disk() -> usize {
    3
}
fn default_dataset_dir() -> PathBuf {
    PathBuf::from(".ethash")
}
fn default_datasets_in_mem() -> usize {
    1
}
fn default_datasets_on_disk() -> usize {
    2
}

impl Default for EthashConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            caches_in_mem: default_caches_in_mem(),
            caches_on_disk: default_caches_on_disk(),
            dataset_dir: default_dataset_dir(),
            datasets_in_mem: default_datasets_in_mem(),
            datasets_on_disk: default_datasets_on_disk(),
            pow_mode: PowMode::Normal,
        }
    }
}

/// The proof-of-work engine.
pub struct Ethash {
    config: EthashConfig,
    /// Local sealing threads: 0 means all cores, negative disables sealing.
    threads: AtomicI32,
    hashrate: AtomicU64,
    remote_hashrates: RwLock<Vec<(Hash, u64)>>,
}

static SHARED: OnceLock<Arc<Ethash>> = OnceLock::new();

impl Ethash {
    pub fn new(config: EthashConfig) -> Self {
        Self {
            config,
            threads: AtomicI32::new(0),
            hashrate: AtomicU64::new(0),
            remote_hashrates: RwLock::new(Vec::new()),
        }
    }

    /// An engine with trivial difficulty, for fast tests.
    pub fn new_tester() -> Self {
        Self::new(EthashConfig {
            pow_mode: PowMode::Test,
            ..EthashConfig::default()
        })
    }

    /// An engine that accepts every seal.
    pub fn new_faker() -> Self {
        Self::new(EthashConfig {
            pow_mode: PowMode::Fake,
            ..EthashConfig::default()
        })
    }

    /// The process-wide shared instance, created on first use.
    pub fn new_shared() -> Arc<Self> {
        SHARED
            .get_or_init(|| {
                Arc::new(Self::new(EthashConfig {
                    pow_mode: PowMode::Shared,
                    ..EthashConfig::default()
                }))
            })
            .clone()
    }

    pub fn config(&self) -> &EthashConfig {
        &self.config
    }

    pub fn mode(&self) -> PowMode {
        self.config.pow_mode
    }

    pub fn threads(&self) -> i32 {
        self.threads.load(Ordering::Relaxed)
    }

    /// Set the number of local sealing threads. A negative value disables
    /// local sealing entirely.
    pub fn set_threads(&self, threads: i32) {
        self.threads.store(threads, Ordering::Relaxed);
    }

    /// Hashes per second, local plus reported remote rates.
    pub fn hashrate(&self) -> u64 {
        let remote: u64 = self.remote_hashrates.read().iter().map(|(_, r)| r).sum();
        self.hashrate.load(Ordering::Relaxed).saturating_add(remote)
    }

    /// Record the hashrate of a remote sealer, replacing its previous report.
    pub fn submit_hashrate(&self, id: Hash, rate: u64) {
        let mut rates = self.remote_hashrates.write();
        match rates.iter_mut().find(|(i, _)| *i == id) {
            Some(entry) => entry.1 = rate,
            None => rates.push((id, rate)),
        }
    }

    fn seal_hash(header: &Header) -> Hash {
        header.hash_with(&header.extra, &Hash::ZERO, 0)
    }

    fn pow_digest(seal_hash: &Hash, nonce: u64) -> [u8; 32] {
        blake2b_256(&[seal_hash.as_bytes(), &nonce.to_be_bytes()])
    }

    fn target(difficulty: &U256) -> U256 {
        U256::MAX / *difficulty
    }

    fn meets_target(seal_hash: &Hash, nonce: u64, target: &U256) -> bool {
        U256::from_big_endian(&Self::pow_digest(seal_hash, nonce)) <= *target
    }

    /// Search the nonce space on all rayon threads until a nonce meets the
    /// target or `stop` is raised.
    fn search(seal_hash: &Hash, target: &U256, stop: &AtomicBool) -> Option<u64> {
        const NOT_FOUND: u64 = u64::MAX;
        let found = AtomicU64::new(NOT_FOUND);
        let num_threads = rayon::current_num_threads().max(1);

        (0..num_threads).into_par_iter().for_each(|thread_id| {
            let stride = num_threads as u64;
            let mut nonce = thread_id as u64;
            loop {
                if found.load(Ordering::Relaxed) != NOT_FOUND || stop.load(Ordering::Relaxed) {
                    return;
                }
                let end = nonce.saturating_add(BATCH_SIZE * stride);
                while nonce < end {
                    if Self::meets_target(seal_hash, nonce, target) {
                        found.store(nonce, Ordering::Relaxed);
                        return;
                    }
                    nonce = nonce.wrapping_add(stride);
                }
            }
        });

        match found.load(Ordering::Relaxed) {
            NOT_FOUND => None,
            nonce => Some(nonce),
        }
    }
}

/// Frontier-style bounded adjustment: each `DURATION_LIMIT` seconds of gap
/// beyond the first lowers difficulty by 1/2048 of the parent, floored at
/// the minimum difficulty.
fn adjusted_difficulty(time: u64, parent: &Header) -> U256 {
    let step = parent.difficulty / U256::from(DIFFICULTY_BOUND_DIVISOR);
    let gap = time.saturating_sub(parent.time) / DURATION_LIMIT;
    let difficulty = if gap == 0 {
        parent.difficulty.saturating_add(step)
    } else {
        let factor = (gap - 1).min(99);
        parent.difficulty.saturating_sub(step * U256::from(factor))
    };
    difficulty.max(U256::from(MINIMUM_DIFFICULTY))
}

impl Engine for Ethash {
    fn name(&self) -> &'static str {
        "ethash"
    }

    fn author(&self, header: &Header) -> Result<Address, ConsensusError> {
        Ok(header.coinbase)
    }

    fn verify_header(&self, chain: &dyn ChainReader, header: &Header) -> Result<(), ConsensusError> {
        if self.mode() == PowMode::Fake {
            return Ok(());
        }
        if header.extra.len() > huc_types::params::MAXIMUM_EXTRA_DATA_SIZE {
            return Err(ConsensusError::ExtraDataTooLong(header.extra.len()));
        }
        let parent = header
            .number
            .checked_sub(1)
            .map(|n| chain.header(&header.parent_hash, n))
            .transpose()?
            .flatten()
            .ok_or(ConsensusError::UnknownAncestor(header.parent_hash))?;
        if header.time <= parent.time {
            return Err(ConsensusError::InvalidTimestamp);
        }
        let want = self.calc_difficulty(chain, header.time, &parent);
        if header.difficulty != want {
            return Err(ConsensusError::InvalidDifficulty {
                have: header.difficulty,
                want,
            });
        }
        self.verify_seal(chain, header)
    }

    fn verify_seal(&self, _chain: &dyn ChainReader, header: &Header) -> Result<(), ConsensusError> {
        if self.mode() == PowMode::Fake {
            return Ok(());
        }
        if header.difficulty.is_zero() {
            return Err(ConsensusError::InvalidDifficulty {
                have: header.difficulty,
                want: U256::one(),
            });
        }
        let seal_hash = Self::seal_hash(header);
        let digest = Hash::new(Self::pow_digest(&seal_hash, header.nonce));
        if header.mix_digest != digest {
            return Err(ConsensusError::InvalidPow);
        }
        if !Self::meets_target(&seal_hash, header.nonce, &Self::target(&header.difficulty)) {
            return Err(ConsensusError::InvalidPow);
        }
        Ok(())
    }

    fn calc_difficulty(&self, _chain: &dyn ChainReader, time: u64, parent: &Header) -> U256 {
        match self.mode() {
            PowMode::Test | PowMode::Fake => U256::one(),
            PowMode::Normal | PowMode::Shared => adjusted_difficulty(time, parent),
        }
    }

    fn block_reward(&self, config: &ChainConfig, header: &Header) -> U256 {
        if config.is_byzantium(header.number) {
            U256::from(BYZANTIUM_BLOCK_REWARD)
        } else {
            U256::from(FRONTIER_BLOCK_REWARD)
        }
    }

    fn seal(&self, _chain: &dyn ChainReader, block: Block, stop: &AtomicBool) -> Result<Block, ConsensusError> {
        let mut header = block.header.clone();
        if self.mode() == PowMode::Fake {
            header.nonce = 0;
            header.mix_digest = Hash::ZERO;
            return Ok(block.with_seal(header));
        }
        if self.threads() < 0 {
            return Err(ConsensusError::SealingDisabled);
        }
        if header.difficulty.is_zero() {
            return Err(ConsensusError::InvalidDifficulty {
                have: header.difficulty,
                want: U256::one(),
            });
        }
        let seal_hash = Self::seal_hash(&header);
        let target = Self::target(&header.difficulty);
        let nonce = Self::search(&seal_hash, &target, stop).ok_or(ConsensusError::SealAborted)?;
        tracing::debug!(number = header.number, nonce, "found proof-of-work nonce");
        header.nonce = nonce;
        header.mix_digest = Hash::new(Self::pow_digest(&seal_hash, nonce));
        Ok(block.with_seal(header))
    }
}

/// RPC service over the proof-of-work engine.
#[derive(Clone)]
pub struct EthashApi {
    ethash: Arc<Ethash>,
}

impl EthashApi {
    pub fn new(ethash: Arc<Ethash>) -> Self {
        Self { ethash }
    }

    pub fn get_hashrate(&self) -> u64 {
        self.ethash.hashrate()
    }

    pub fn submit_hashrate(&self, rate: u64, id: Hash) -> bool {
        self.ethash.submit_hashrate(id, rate);
        true
    }
}
