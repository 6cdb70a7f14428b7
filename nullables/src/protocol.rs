//! Nullable protocol manager, bloom indexer and light server.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use huc_core::{BlockChain, BloomIndexer, CoreError, LesServer, Protocol, ProtocolManager, SyncProgress};
use huc_types::Hash;
use parking_lot::Mutex;

use crate::CallJournal;

/// Protocol versions advertised by the full-node protocol.
pub const HUC_PROTOCOLS: [Protocol; 2] = [
    Protocol {
        name: "huc",
        version: 63,
        length: 17,
    },
    Protocol {
        name: "huc",
        version: 62,
        length: 8,
    },
];

/// Records the capacity it was started with; never talks to a peer.
#[derive(Default)]
pub struct NullProtocolManager {
    max_peers: Mutex<Option<usize>>,
    accept_txs: AtomicBool,
    stopped: AtomicBool,
    sync_cancels: AtomicUsize,
    progress: Mutex<SyncProgress>,
    journal: CallJournal,
}

impl NullProtocolManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_journal(mut self, journal: CallJournal) -> Self {
        self.journal = journal;
        self
    }

    /// Capacity passed to `start`, if it was called.
    pub fn started_with(&self) -> Option<usize> {
        *self.max_peers.lock()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    pub fn sync_cancels(&self) -> usize {
        self.sync_cancels.load(Ordering::Acquire)
    }

    pub fn set_progress(&self, progress: SyncProgress) {
        *self.progress.lock() = progress;
    }
}

impl ProtocolManager for NullProtocolManager {
    fn start(&self, max_peers: usize) {
        *self.max_peers.lock() = Some(max_peers);
        tracing::debug!(max_peers, "protocol manager started");
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
        self.journal.record("protocol manager stopped");
        tracing::info!("HappyUC protocol stopped");
    }

    fn sub_protocols(&self) -> Vec<Protocol> {
        HUC_PROTOCOLS.to_vec()
    }

    fn set_accept_txs(&self, accept: bool) {
        self.accept_txs.store(accept, Ordering::Release);
    }

    fn accepts_txs(&self) -> bool {
        self.accept_txs.load(Ordering::Acquire)
    }

    fn sync_progress(&self) -> SyncProgress {
        *self.progress.lock()
    }

    fn cancel_sync(&self) {
        self.sync_cancels.fetch_add(1, Ordering::AcqRel);
    }

    fn peer_count(&self) -> usize {
        0
    }
}

/// Reports sections covering the canonical chain of the chain it was
/// started against.
pub struct NullBloomIndexer {
    section_size: u64,
    chain: Mutex<Option<Arc<dyn BlockChain>>>,
    closed: AtomicBool,
    override_sections: AtomicU64,
    journal: CallJournal,
}

impl NullBloomIndexer {
    pub fn new(section_size: u64) -> Self {
        Self {
            section_size: section_size.max(1),
            chain: Mutex::new(None),
            closed: AtomicBool::new(false),
            override_sections: AtomicU64::new(0),
            journal: CallJournal::default(),
        }
    }

    pub fn with_journal(mut self, journal: CallJournal) -> Self {
        self.journal = journal;
        self
    }

    pub fn is_started(&self) -> bool {
        self.chain.lock().is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Report at least `sections` sections regardless of chain height.
    pub fn set_min_sections(&self, sections: u64) {
        self.override_sections.store(sections, Ordering::Release);
    }
}

impl BloomIndexer for NullBloomIndexer {
    fn start(&self, chain: Arc<dyn BlockChain>) {
        *self.chain.lock() = Some(chain);
    }

    fn sections(&self) -> (u64, u64, Hash) {
        let chain = self.chain.lock().clone();
        let head = chain
            .as_ref()
            .and_then(|c| c.current_block().ok())
            .map_or(0, |b| b.number());
        let sections = ((head + 1) / self.section_size).max(self.override_sections.load(Ordering::Acquire));
        if sections == 0 {
            return (0, 0, Hash::ZERO);
        }
        let last = sections * self.section_size - 1;
        let hash = chain
            .and_then(|c| c.header_by_number(last).ok().flatten())
            .map_or(Hash::ZERO, |h| h.hash());
        (sections, last, hash)
    }

    fn close(&self) -> Result<(), CoreError> {
        self.closed.store(true, Ordering::Release);
        self.journal.record("bloom indexer closed");
        Ok(())
    }
}

/// A light server that only tracks its lifecycle.
#[derive(Default)]
pub struct NullLesServer {
    started: AtomicBool,
    stopped: AtomicBool,
    has_indexer: AtomicBool,
    journal: CallJournal,
}

impl NullLesServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_journal(mut self, journal: CallJournal) -> Self {
        self.journal = journal;
        self
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    pub fn has_bloom_indexer(&self) -> bool {
        self.has_indexer.load(Ordering::Acquire)
    }
}

impl LesServer for NullLesServer {
    fn start(&self) {
        self.started.store(true, Ordering::Release);
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
        self.journal.record("light server stopped");
    }

    fn protocols(&self) -> Vec<Protocol> {
        vec![Protocol {
            name: "les",
            version: 2,
            length: 21,
        }]
    }

    fn set_bloom_indexer(&self, _indexer: Arc<dyn BloomIndexer>) {
        self.has_indexer.store(true, Ordering::Release);
    }
}
