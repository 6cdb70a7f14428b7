//! Gas price suggestions sampled from recent blocks.

use std::sync::Arc;

use huc_core::{BlockChain, ChainError};
use huc_types::{Block, Hash, U256};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Upper bound on any suggestion: 500 gwei.
pub const MAX_PRICE: u64 = 500_000_000_000;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpoConfig {
    /// Number of recent blocks to sample.
    #[serde(default = "default_blocks")]
    pub blocks: usize,
    /// Which percentile of the samples to suggest.
    #[serde(default = "default_percentile")]
    pub percentile: usize,
    /// Suggestion before any block has been sampled.
    #[serde(default)]
    pub default: Option<U256>,
}

fn default_blocks() -> usize {
    20
}

fn default_percentile() -> usize {
    60
}

impl Default for GpoConfig {
    fn default() -> Self {
        Self {
            blocks: default_blocks(),
            percentile: default_percentile(),
            default: None,
        }
    }
}

/// Suggests a gas price from the cheapest transactions of recent blocks,
/// cached per chain head.
pub struct Oracle {
    chain: Arc<dyn BlockChain>,
    blocks: usize,
    percentile: usize,
    max_price: U256,
    last: Mutex<(Hash, U256)>,
}

impl Oracle {
    pub fn new(chain: Arc<dyn BlockChain>, config: GpoConfig) -> Self {
        Self {
            chain,
            blocks: config.blocks.max(1),
            percentile: config.percentile.min(100),
            max_price: U256::from(MAX_PRICE),
            last: Mutex::new((Hash::ZERO, config.default.unwrap_or_default())),
        }
    }

    pub fn suggest_price(&self) -> Result<U256, ChainError> {
        let head = self.chain.current_block()?;
        let head_hash = head.hash();
        let last_price = {
            let last = self.last.lock();
            if last.0 == head_hash {
                return Ok(last.1);
            }
            last.1
        };

        // Look back at most twice the sample size to skip empty blocks.
        let mut samples = Vec::with_capacity(self.blocks);
        let mut number = head.number();
        let mut looked = 0;
        let mut block = Some(head);
        while let Some(current) = block {
            if let Some(price) = lowest_price(&current) {
                samples.push(price);
            }
            looked += 1;
            if samples.len() >= self.blocks || looked >= 2 * self.blocks || number == 0 {
                break;
            }
            number -= 1;
            block = self.chain.block_by_number(number)?;
        }

        let price = if samples.is_empty() {
            last_price
        } else {
            samples.sort();
            let idx = (samples.len() - 1) * self.percentile / 100;
            samples[idx].min(self.max_price)
        };
        *self.last.lock() = (head_hash, price);
        tracing::trace!(head = %head_hash, samples = samples.len(), price = %price, "gas price suggestion");
        Ok(price)
    }
}

/// Cheapest transaction not paid to the block's own coinbase.
fn lowest_price(block: &Block) -> Option<U256> {
    let coinbase = block.coinbase();
    block
        .transactions
        .iter()
        .filter(|tx| tx.from != coinbase)
        .map(|tx| tx.gas_price)
        .min()
}
