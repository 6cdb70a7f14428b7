//! Mining coordinator — coinbase selection, signer authorization, and the
//! lifecycle of the mining subsystem.
//!
//! The coinbase and the default gas price are the only node state that can
//! change after construction. Both live in [`MiningParams`] behind one lock;
//! the lock is never held across a call into another subsystem.

use std::sync::Arc;

use huc_consensus::{ConsensusEngine, ConsensusError, SignerFn};
use huc_core::{Account, Manager, Miner, ProtocolManager, TxPool};
use huc_types::{Address, Hash, U256};
use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::error::NodeError;
use crate::metrics::NodeMetrics;

/// The mutable mining parameters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MiningParams {
    pub coinbase: Option<Address>,
    pub gas_price: U256,
}

pub struct MiningCoordinator {
    params: RwLock<MiningParams>,
    miner: Arc<dyn Miner>,
    engine: ConsensusEngine,
    account_manager: Arc<Manager>,
    protocol_manager: Arc<dyn ProtocolManager>,
    tx_pool: Arc<dyn TxPool>,
    metrics: Arc<NodeMetrics>,
    /// Launch epoch. A queued launch only starts the miner if no stop has
    /// happened since it was issued.
    launch_gate: Arc<Mutex<u64>>,
    /// Asynchronous miner launches, joined on stop.
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl MiningCoordinator {
    pub fn new(
        params: MiningParams,
        miner: Arc<dyn Miner>,
        engine: ConsensusEngine,
        account_manager: Arc<Manager>,
        protocol_manager: Arc<dyn ProtocolManager>,
        tx_pool: Arc<dyn TxPool>,
        metrics: Arc<NodeMetrics>,
    ) -> Self {
        Self {
            params: RwLock::new(params),
            miner,
            engine,
            account_manager,
            protocol_manager,
            tx_pool,
            metrics,
            launch_gate: Arc::new(Mutex::new(0)),
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn params(&self) -> MiningParams {
        *self.params.read()
    }

    /// The address mining rewards go to.
    ///
    /// Without a configured coinbase the first account of the first wallet
    /// is adopted and remembered.
    pub fn coinbase(&self) -> Result<Address, NodeError> {
        if let Some(coinbase) = self.params.read().coinbase {
            return Ok(coinbase);
        }
        let first = self
            .account_manager
            .wallets()
            .first()
            .and_then(|wallet| wallet.accounts().into_iter().next());
        let Some(account) = first else {
            return Err(NodeError::CoinbaseRequired);
        };

        let coinbase = {
            let mut params = self.params.write();
            *params.coinbase.get_or_insert(account.address)
        };
        tracing::info!(address = %coinbase, "Coinbase automatically configured");
        Ok(coinbase)
    }

    pub fn set_coinbase(&self, coinbase: Address) {
        self.params.write().coinbase = Some(coinbase);
        self.miner.set_coinbase(coinbase);
    }

    pub fn gas_price(&self) -> U256 {
        self.params.read().gas_price
    }

    /// Update the default gas price and the pool's acceptance floor.
    pub fn set_gas_price(&self, price: U256) {
        self.params.write().gas_price = price;
        self.tx_pool.set_gas_price(price);
    }

    pub fn set_extra(&self, extra: Vec<u8>) -> Result<(), NodeError> {
        Ok(self.miner.set_extra(extra)?)
    }

    /// Start producing blocks.
    ///
    /// Under proof-of-authority the engine is first authorized to sign with
    /// the wallet holding the coinbase. `local` lets the protocol layer take
    /// transactions before the initial sync is done. The miner itself is
    /// launched on a blocking task; this returns before it is running.
    pub fn start_mining(&self, local: bool) -> Result<(), NodeError> {
        let coinbase = self.coinbase().inspect_err(|e| {
            tracing::error!(error = %e, "Cannot start mining without coinbase");
        })?;

        if let Some(clique) = self.engine.clique() {
            let account = Account::new(coinbase);
            let wallet = self.account_manager.find(&account).map_err(|e| {
                tracing::error!(address = %coinbase, error = %e, "Coinbase account unavailable locally");
                NodeError::SignerUnavailable(e)
            })?;
            let sign_fn: SignerFn = Arc::new(move |hash: &Hash| {
                wallet
                    .sign_hash(&account, hash)
                    .map_err(|e| ConsensusError::SignFailed(e.to_string()))
            });
            clique.authorize(coinbase, sign_fn);
        }

        if local {
            self.protocol_manager.set_accept_txs(true);
        }

        let miner = Arc::clone(&self.miner);
        let gate = Arc::clone(&self.launch_gate);
        let epoch = *gate.lock();
        let handle = tokio::task::spawn_blocking(move || {
            let current = gate.lock();
            if *current == epoch {
                miner.start(coinbase);
            } else {
                tracing::debug!(address = %coinbase, "miner launch superseded by stop");
            }
        });
        self.tasks.lock().push(handle);
        self.metrics.mining_active.set(1);
        Ok(())
    }

    /// Stop the miner. Launches still queued when this returns never start it.
    pub fn stop_mining(&self) {
        let mut epoch = self.launch_gate.lock();
        *epoch += 1;
        self.miner.stop();
        drop(epoch);
        self.metrics.mining_active.set(0);
    }

    pub fn is_mining(&self) -> bool {
        self.miner.is_mining()
    }

    pub fn miner(&self) -> &Arc<dyn Miner> {
        &self.miner
    }

    pub fn hashrate(&self) -> u64 {
        self.miner.hashrate()
    }

    /// Wait for every launch issued so far.
    pub async fn join_pending(&self) {
        for handle in self.take_tasks() {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "miner launch failed");
            }
        }
    }

    /// Hand the outstanding launch tasks to the caller.
    pub fn take_tasks(&self) -> Vec<JoinHandle<()>> {
        std::mem::take(&mut *self.tasks.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use huc_consensus::Ethash;
    use huc_core::{BlockChain, CacheConfig, Genesis, TxPoolConfig, VmConfig, Wallet};
    use huc_nullables::{NullChain, NullDatabase, NullMiner, NullProtocolManager, NullTxPool, NullWallet};
    use huc_store::Database;
    use huc_types::ChainConfig;

    struct Harness {
        coordinator: MiningCoordinator,
        miner: Arc<NullMiner>,
        pool: Arc<NullTxPool>,
        protocol: Arc<NullProtocolManager>,
        accounts: Arc<Manager>,
    }

    fn harness(coinbase: Option<Address>) -> Harness {
        let db: Arc<dyn Database> = Arc::new(NullDatabase::new());
        let config = ChainConfig::all_forks(7);
        Genesis::with_config(config.clone()).commit(db.as_ref()).unwrap();
        let engine = ConsensusEngine::Ethash(Arc::new(Ethash::new_faker()));
        let chain: Arc<dyn BlockChain> = Arc::new(
            NullChain::new(db, config, engine.clone(), CacheConfig::default(), VmConfig::default()).unwrap(),
        );
        let pool = Arc::new(NullTxPool::new(TxPoolConfig::default(), chain.clone()));
        let miner = Arc::new(NullMiner::new(chain, pool.clone()));
        let protocol = Arc::new(NullProtocolManager::new());
        let accounts = Arc::new(Manager::default());
        let coordinator = MiningCoordinator::new(
            MiningParams {
                coinbase,
                gas_price: U256::from(1u64),
            },
            miner.clone(),
            engine,
            accounts.clone(),
            protocol.clone(),
            pool.clone(),
            Arc::new(NodeMetrics::new().unwrap()),
        );
        Harness {
            coordinator,
            miner,
            pool,
            protocol,
            accounts,
        }
    }

    #[test]
    fn configured_coinbase_wins() {
        let configured = Address::new([5; 20]);
        let h = harness(Some(configured));
        h.accounts.add_wallet(Arc::new(NullWallet::single([1; 32])));
        assert_eq!(h.coordinator.coinbase().unwrap(), configured);
    }

    #[test]
    fn no_accounts_means_no_coinbase() {
        let h = harness(None);
        assert!(matches!(h.coordinator.coinbase(), Err(NodeError::CoinbaseRequired)));
    }

    #[test]
    fn first_account_of_first_wallet_is_adopted() {
        let h = harness(None);
        h.accounts.add_wallet(Arc::new(NullWallet::new("first", vec![[2; 32], [3; 32]])));
        h.accounts.add_wallet(Arc::new(NullWallet::single([4; 32])));
        let first = h.accounts.wallets()[0].accounts()[0].address;
        assert_eq!(h.coordinator.coinbase().unwrap(), first);
        assert_eq!(h.coordinator.params().coinbase, Some(first));
    }

    #[test]
    fn set_coinbase_reaches_miner() {
        let h = harness(None);
        let address = Address::new([8; 20]);
        h.coordinator.set_coinbase(address);
        assert_eq!(h.coordinator.coinbase().unwrap(), address);
        assert_eq!(h.miner.coinbase(), address);
    }

    #[test]
    fn oversized_extra_is_rejected() {
        let h = harness(None);
        assert!(matches!(
            h.coordinator.set_extra(vec![0; 33]),
            Err(NodeError::Miner(_))
        ));
        h.coordinator.set_extra(b"hello".to_vec()).unwrap();
        assert_eq!(h.miner.extra(), b"hello".to_vec());
    }

    #[test]
    fn gas_price_reaches_the_pool() {
        let h = harness(None);
        h.coordinator.set_gas_price(U256::from(99u64));
        assert_eq!(h.coordinator.gas_price(), U256::from(99u64));
        assert_eq!(h.pool.gas_price(), U256::from(99u64));
    }

    #[tokio::test]
    async fn local_mining_accepts_txs_and_launches_miner() {
        let h = harness(Some(Address::new([6; 20])));
        h.coordinator.start_mining(true).unwrap();
        h.coordinator.join_pending().await;
        assert!(h.coordinator.is_mining());
        assert!(h.protocol.accepts_txs());
        assert_eq!(h.miner.coinbase(), Address::new([6; 20]));

        h.coordinator.stop_mining();
        assert!(!h.coordinator.is_mining());
        assert_eq!(h.miner.stop_count(), 1);
    }

    #[tokio::test]
    async fn remote_mining_leaves_tx_acceptance_alone() {
        let h = harness(Some(Address::new([6; 20])));
        h.coordinator.start_mining(false).unwrap();
        h.coordinator.join_pending().await;
        assert!(!h.protocol.accepts_txs());
        assert_eq!(h.miner.start_count(), 1);
    }

    #[test]
    fn stop_supersedes_a_queued_launch() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .max_blocking_threads(1)
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async {
            let h = harness(Some(Address::new([6; 20])));
            let busy = tokio::task::spawn_blocking(|| std::thread::sleep(std::time::Duration::from_millis(200)));
            h.coordinator.start_mining(true).unwrap();
            h.coordinator.stop_mining();
            busy.await.unwrap();
            h.coordinator.join_pending().await;

            assert!(!h.coordinator.is_mining());
            assert_eq!(h.miner.start_count(), 0);
            assert_eq!(h.miner.stop_count(), 1);
        });
    }

    #[tokio::test]
    async fn start_after_stop_launches_again() {
        let h = harness(Some(Address::new([6; 20])));
        h.coordinator.stop_mining();
        h.coordinator.start_mining(false).unwrap();
        h.coordinator.join_pending().await;
        assert!(h.coordinator.is_mining());
    }
}
