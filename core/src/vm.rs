//! Execution environment for message calls.
//!
//! Bytecode interpretation is not part of this node; [`Evm`] applies the
//! value and gas accounting of a message against a state snapshot, which is
//! what read-only calls and gas estimation observe.

use std::sync::Arc;

use huc_types::{Address, Hash, Header, U256};

use crate::chain::BlockChain;
use crate::state::StateDb;

/// Gas charged for any message before execution.
pub const TX_GAS: u64 = 21_000;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VmConfig {
    pub enable_preimage_recording: bool,
    pub debug: bool,
}

/// A call to execute, with sender already known.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Message {
    pub from: Address,
    pub to: Option<Address>,
    pub nonce: u64,
    pub value: U256,
    pub gas: u64,
    pub gas_price: U256,
    pub data: Vec<u8>,
    pub check_nonce: bool,
}

type GetHashFn = Arc<dyn Fn(u64) -> Option<Hash> + Send + Sync>;

/// Block-level values visible during execution.
#[derive(Clone)]
pub struct EvmContext {
    pub origin: Address,
    pub gas_price: U256,
    pub coinbase: Address,
    pub block_number: u64,
    pub time: u64,
    pub difficulty: U256,
    pub gas_limit: u64,
    get_hash: GetHashFn,
}

impl EvmContext {
    /// Build the context for executing `msg` on top of `header`.
    ///
    /// Without an explicit `author`, the beneficiary is whoever the chain's
    /// engine says sealed the header.
    pub fn new(msg: &Message, header: &Header, chain: Arc<dyn BlockChain>, author: Option<Address>) -> Self {
        let coinbase = author.unwrap_or_else(|| {
            chain
                .engine()
                .engine()
                .author(header)
                .unwrap_or(header.coinbase)
        });
        let head_number = header.number;
        let get_hash: GetHashFn = Arc::new(move |n: u64| {
            if n >= head_number {
                return None;
            }
            chain
                .header_by_number(n)
                .ok()
                .flatten()
                .map(|h| h.hash())
        });
        Self {
            origin: msg.from,
            gas_price: msg.gas_price,
            coinbase,
            block_number: header.number,
            time: header.time,
            difficulty: header.difficulty,
            gas_limit: header.gas_limit,
            get_hash,
        }
    }

    /// Hash of an ancestor block, as seen by the executing call.
    pub fn block_hash(&self, number: u64) -> Option<Hash> {
        (self.get_hash)(number)
    }
}

impl std::fmt::Debug for EvmContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvmContext")
            .field("origin", &self.origin)
            .field("coinbase", &self.coinbase)
            .field("block_number", &self.block_number)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionResult {
    pub used_gas: u64,
    pub return_data: Vec<u8>,
    pub failed: bool,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum VmError {
    #[error("intrinsic gas too low")]
    IntrinsicGas,

    #[error("insufficient balance for transfer")]
    InsufficientBalance,

    #[error("nonce mismatch: have {have}, want {want}")]
    NonceMismatch { have: u64, want: u64 },
}

/// An execution environment bound to a state snapshot.
pub struct Evm {
    context: EvmContext,
    state: StateDb,
    config: VmConfig,
}

impl Evm {
    pub fn new(context: EvmContext, state: StateDb, config: VmConfig) -> Self {
        Self {
            context,
            state,
            config,
        }
    }

    pub fn context(&self) -> &EvmContext {
        &self.context
    }

    pub fn state(&self) -> &StateDb {
        &self.state
    }

    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    /// Apply the message's gas purchase and value transfer.
    pub fn call(&mut self, msg: &Message) -> Result<ExecutionResult, VmError> {
        if msg.gas < TX_GAS {
            return Err(VmError::IntrinsicGas);
        }
        if msg.check_nonce {
            let want = self.state.get_nonce(&msg.from);
            if msg.nonce != want {
                return Err(VmError::NonceMismatch {
                    have: msg.nonce,
                    want,
                });
            }
        }
        let gas_cost = msg.gas_price.saturating_mul(U256::from(TX_GAS));
        if !self.state.sub_balance(msg.from, gas_cost.saturating_add(msg.value)) {
            return Err(VmError::InsufficientBalance);
        }
        if let Some(to) = msg.to {
            self.state.add_balance(to, msg.value);
        }
        self.state.add_balance(self.context.coinbase, gas_cost);
        let nonce = self.state.get_nonce(&msg.from);
        self.state.set_nonce(msg.from, nonce + 1);
        Ok(ExecutionResult {
            used_gas: TX_GAS,
            return_data: Vec::new(),
            failed: false,
        })
    }
}
