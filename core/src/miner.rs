//! The mining subsystem contract.

use huc_types::{Address, Block};

use crate::state::StateDb;
use crate::MinerError;

/// Block production and the pending (speculative) block.
pub trait Miner: Send + Sync {
    /// Begin producing blocks credited to `coinbase`. May block until the
    /// worker is running; callers spawn it.
    fn start(&self, coinbase: Address);

    fn stop(&self);

    fn is_mining(&self) -> bool;

    /// The block under construction, never persisted. `None` while no
    /// block is being built.
    fn pending_block(&self) -> Result<Option<Block>, MinerError>;

    /// The pending block with the state it would produce.
    fn pending(&self) -> Result<Option<(Block, StateDb)>, MinerError>;

    fn set_coinbase(&self, coinbase: Address);

    fn set_extra(&self, extra: Vec<u8>) -> Result<(), MinerError>;

    fn hashrate(&self) -> u64;
}
