//! Abstract block references used by queries.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TypesError;

/// A reference to a block, resolved by the query backend.
///
/// `Pending` names the miner's speculative block. It is never persisted and
/// must never be confused with `Latest`, the canonical head.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockRef {
    /// The current canonical head.
    Latest,
    /// The block currently being assembled by the miner.
    Pending,
    /// A specific canonical height.
    Numbered(u64),
}

impl BlockRef {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

impl From<u64> for BlockRef {
    fn from(number: u64) -> Self {
        Self::Numbered(number)
    }
}

impl fmt::Display for BlockRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => write!(f, "latest"),
            Self::Pending => write!(f, "pending"),
            Self::Numbered(n) => write!(f, "{n:#x}"),
        }
    }
}

impl FromStr for BlockRef {
    type Err = TypesError;

    /// Accepts `latest`, `pending`, `earliest`, hex (`0x1f`) or decimal heights.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "latest" => Ok(Self::Latest),
            "pending" => Ok(Self::Pending),
            "earliest" => Ok(Self::Numbered(0)),
            _ => {
                let parsed = match s.strip_prefix("0x") {
                    Some(hex) => u64::from_str_radix(hex, 16),
                    None => s.parse(),
                };
                parsed
                    .map(Self::Numbered)
                    .map_err(|_| TypesError::InvalidBlockRef(s.to_string()))
            }
        }
    }
}
