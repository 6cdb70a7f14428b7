//! Chain configuration and fork-schedule compatibility.
//!
//! A node stores the configuration it validated its chain under, keyed by
//! genesis hash. When the operator supplies a different configuration, the
//! two are compared at the current head: any fork whose activation moved
//! across an already-processed height makes the stored chain invalid from
//! that height on, reported as a [`ConfigCompatError`] carrying the height
//! to rewind to.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Default number of blocks after which a proof-of-authority engine
/// checkpoints its signer set.
pub const DEFAULT_CLIQUE_EPOCH: u64 = 30_000;

/// Proof-of-authority parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliqueConfig {
    /// Seconds between blocks.
    pub period: u64,
    /// Blocks between signer-set checkpoints. Zero means the default.
    #[serde(default)]
    pub epoch: u64,
}

/// The fork schedule and consensus selection of a chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    pub chain_id: u64,
    #[serde(default)]
    pub homestead_block: Option<u64>,
    #[serde(default)]
    pub eip150_block: Option<u64>,
    #[serde(default)]
    pub eip155_block: Option<u64>,
    #[serde(default)]
    pub eip158_block: Option<u64>,
    #[serde(default)]
    pub byzantium_block: Option<u64>,
    /// Present when the chain is sealed by proof-of-authority.
    #[serde(default)]
    pub clique: Option<CliqueConfig>,
}

impl ChainConfig {
    /// The main network configuration.
    pub fn mainnet() -> Self {
        Self {
            chain_id: 1,
            homestead_block: Some(1_150_000),
            eip150_block: Some(2_463_000),
            eip155_block: Some(2_675_000),
            eip158_block: Some(2_675_000),
            byzantium_block: Some(4_370_000),
            clique: None,
        }
    }

    /// A configuration with every fork active from genesis, used for
    /// development chains and tests.
    pub fn all_forks(chain_id: u64) -> Self {
        Self {
            chain_id,
            homestead_block: Some(0),
            eip150_block: Some(0),
            eip155_block: Some(0),
            eip158_block: Some(0),
            byzantium_block: Some(0),
            clique: None,
        }
    }

    pub fn is_homestead(&self, number: u64) -> bool {
        is_forked(self.homestead_block, number)
    }

    pub fn is_eip155(&self, number: u64) -> bool {
        is_forked(self.eip155_block, number)
    }

    pub fn is_eip158(&self, number: u64) -> bool {
        is_forked(self.eip158_block, number)
    }

    pub fn is_byzantium(&self, number: u64) -> bool {
        is_forked(self.byzantium_block, number)
    }

    /// Check whether a chain validated under `self` up to `height` is still
    /// valid under `new`.
    ///
    /// Repeats the check at each reported rewind height so the returned
    /// error names the earliest incompatibility.
    pub fn check_compatible(&self, new: &ChainConfig, height: u64) -> Result<(), ConfigCompatError> {
        let mut head = height;
        let mut last: Option<ConfigCompatError> = None;
        while let Some(err) = self.check_compatible_at(new, head) {
            if last.as_ref().is_some_and(|l| l.rewind_to == err.rewind_to) {
                break;
            }
            head = err.rewind_to;
            last = Some(err);
        }
        match last {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn check_compatible_at(&self, new: &ChainConfig, head: u64) -> Option<ConfigCompatError> {
        let forks = [
            ("Homestead fork block", self.homestead_block, new.homestead_block),
            ("EIP150 fork block", self.eip150_block, new.eip150_block),
            ("EIP155 fork block", self.eip155_block, new.eip155_block),
            ("EIP158 fork block", self.eip158_block, new.eip158_block),
        ];
        for (what, stored, proposed) in forks {
            if is_fork_incompatible(stored, proposed, head) {
                return Some(ConfigCompatError::new(what, stored, proposed));
            }
        }
        if self.is_eip158(head) && self.chain_id != new.chain_id {
            return Some(ConfigCompatError::new(
                "EIP158 chain ID",
                self.eip158_block,
                new.eip158_block,
            ));
        }
        if is_fork_incompatible(self.byzantium_block, new.byzantium_block, head) {
            return Some(ConfigCompatError::new(
                "Byzantium fork block",
                self.byzantium_block,
                new.byzantium_block,
            ));
        }
        None
    }
}

impl fmt::Display for ChainConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let engine = if self.clique.is_some() { "clique" } else { "ethash" };
        write!(
            f,
            "{{ChainID: {} Homestead: {:?} EIP150: {:?} EIP155: {:?} EIP158: {:?} Byzantium: {:?} Engine: {}}}",
            self.chain_id,
            self.homestead_block,
            self.eip150_block,
            self.eip155_block,
            self.eip158_block,
            self.byzantium_block,
            engine
        )
    }
}

fn is_forked(fork: Option<u64>, head: u64) -> bool {
    fork.is_some_and(|f| f <= head)
}

fn is_fork_incompatible(stored: Option<u64>, new: Option<u64>, head: u64) -> bool {
    (is_forked(stored, head) || is_forked(new, head)) && stored != new
}

/// A fork-schedule change that invalidates part of the stored chain.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("mismatching {what} in database (have {stored:?}, want {new:?}, rewindto {rewind_to})")]
pub struct ConfigCompatError {
    pub what: String,
    pub stored: Option<u64>,
    pub new: Option<u64>,
    /// The highest block that is still valid under the new configuration.
    pub rewind_to: u64,
}

impl ConfigCompatError {
    fn new(what: &str, stored: Option<u64>, new: Option<u64>) -> Self {
        let rewind = match (stored, new) {
            (None, n) => n,
            (Some(s), None) => Some(s),
            (Some(s), Some(n)) => Some(s.min(n)),
        };
        Self {
            what: what.to_string(),
            stored,
            new,
            rewind_to: rewind.filter(|r| *r > 0).map(|r| r - 1).unwrap_or(0),
        }
    }
}
