//! Peer protocol and light-server contracts.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::bloombits::BloomIndexer;

/// A devp2p-style sub-protocol the node advertises.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Protocol {
    pub name: &'static str,
    pub version: u32,
    /// Number of message codes the protocol uses.
    pub length: u64,
}

/// Snapshot of chain synchronisation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncProgress {
    pub starting_block: u64,
    pub current_block: u64,
    pub highest_block: u64,
    pub pulled_states: u64,
    pub known_states: u64,
}

/// Peer handling and chain synchronisation.
pub trait ProtocolManager: Send + Sync {
    /// Begin accepting peers, up to `max_peers`.
    fn start(&self, max_peers: usize);

    fn stop(&self);

    fn sub_protocols(&self) -> Vec<Protocol>;

    /// Accept transactions from peers before the initial sync completes.
    fn set_accept_txs(&self, accept: bool);

    fn accepts_txs(&self) -> bool;

    fn sync_progress(&self) -> SyncProgress;

    /// Abort an in-flight synchronisation.
    fn cancel_sync(&self);

    fn peer_count(&self) -> usize;
}

/// Optional server for light clients, attached after construction.
pub trait LesServer: Send + Sync {
    fn start(&self);

    fn stop(&self);

    fn protocols(&self) -> Vec<Protocol>;

    /// Share the full node's bloom indexer.
    fn set_bloom_indexer(&self, indexer: Arc<dyn BloomIndexer>);
}
