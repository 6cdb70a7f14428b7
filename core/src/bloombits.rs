//! Bloom-bit retrieval scheduling for log searches.
//!
//! A log search needs, for each bloom bit its filter touches, the bit
//! vector of every section in the searched range. A [`MatcherSession`]
//! tracks which `(bit, section)` pairs are still outstanding;
//! [`multiplex`] pulls batches from a session and hands them to the node's
//! bloom handlers as [`BloomRequest`]s over one shared channel.

use std::collections::{BTreeMap, VecDeque};
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

use huc_types::params::BLOOM_BITS_BLOCKS;
use huc_types::Hash;
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot, watch};

use crate::chain::BlockChain;
use crate::CoreError;

/// Bytes in one section's bit vector (one bit per block).
pub const SECTION_BITSET_LEN: usize = (BLOOM_BITS_BLOCKS / 8) as usize;

/// One batch of sections to fetch for a single bloom bit.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Retrieval {
    pub bit: u32,
    pub sections: Vec<u64>,
    /// Filled by the handler, one vector per section, same order.
    pub bitsets: Vec<Vec<u8>>,
    pub error: Option<String>,
}

impl Retrieval {
    pub fn new(bit: u32, sections: Vec<u64>) -> Self {
        Self {
            bit,
            sections,
            bitsets: Vec::new(),
            error: None,
        }
    }
}

/// A retrieval task with the channel its result goes back on.
#[derive(Debug)]
pub struct BloomRequest {
    pub task: Retrieval,
    pub reply: oneshot::Sender<Retrieval>,
}

/// Builds per-section bloom bits behind the chain head.
pub trait BloomIndexer: Send + Sync {
    /// Begin following `chain`.
    fn start(&self, chain: Arc<dyn BlockChain>);

    /// `(sections, last indexed block, hash of that block)`.
    fn sections(&self) -> (u64, u64, Hash);

    /// Persist progress and stop.
    fn close(&self) -> Result<(), CoreError>;
}

#[derive(Default)]
struct SessionState {
    unallocated: BTreeMap<u32, VecDeque<u64>>,
    delivered: BTreeMap<(u32, u64), Vec<u8>>,
    error: Option<String>,
}

/// Retrieval bookkeeping for one log search.
pub struct MatcherSession {
    bits: Vec<u32>,
    begin: u64,
    end: u64,
    /// Empty when `begin > end`.
    sections: RangeInclusive<u64>,
    state: Mutex<SessionState>,
    quit: watch::Sender<bool>,
}

impl MatcherSession {
    /// A session over blocks `begin..=end` needing the given bloom bits.
    /// An inverted range yields a session that is complete and matches
    /// nothing.
    pub fn new(bits: Vec<u32>, begin: u64, end: u64) -> Self {
        let sections = if begin <= end {
            begin / BLOOM_BITS_BLOCKS..=end / BLOOM_BITS_BLOCKS
        } else {
            RangeInclusive::new(1, 0)
        };
        let mut bits = bits;
        bits.sort_unstable();
        bits.dedup();
        let unallocated = bits
            .iter()
            .map(|&bit| (bit, sections.clone().collect::<VecDeque<_>>()))
            .collect();
        let (quit, _) = watch::channel(false);
        Self {
            bits,
            begin,
            end,
            sections,
            state: Mutex::new(SessionState {
                unallocated,
                ..SessionState::default()
            }),
            quit,
        }
    }

    /// A bit that still has sections to hand out, or `None` when the
    /// session is closed or fully allocated.
    pub fn allocate_retrieval(&self) -> Option<u32> {
        if self.is_closed() {
            return None;
        }
        self.state
            .lock()
            .unallocated
            .iter()
            .find(|(_, sections)| !sections.is_empty())
            .map(|(bit, _)| *bit)
    }

    /// Sections of `bit` not yet handed out.
    pub fn pending_sections(&self, bit: u32) -> usize {
        self.state
            .lock()
            .unallocated
            .get(&bit)
            .map_or(0, VecDeque::len)
    }

    /// Take up to `max` outstanding sections of `bit`.
    pub fn allocate_sections(&self, bit: u32, max: usize) -> Vec<u64> {
        let mut state = self.state.lock();
        match state.unallocated.get_mut(&bit) {
            Some(queue) => {
                let n = max.min(queue.len());
                queue.drain(..n).collect()
            }
            None => Vec::new(),
        }
    }

    /// Put allocated sections back, e.g. when a request could not be sent.
    pub fn return_sections(&self, bit: u32, sections: &[u64]) {
        let mut state = self.state.lock();
        let queue = state.unallocated.entry(bit).or_default();
        for section in sections.iter().rev() {
            queue.push_front(*section);
        }
    }

    /// Record retrieved bit vectors.
    pub fn deliver_sections(&self, bit: u32, sections: &[u64], bitsets: Vec<Vec<u8>>) {
        let mut state = self.state.lock();
        for (section, bits) in sections.iter().zip(bitsets) {
            state.delivered.insert((bit, *section), bits);
        }
    }

    /// Record a failure and close the session.
    pub fn fail(&self, error: impl Into<String>) {
        let error = error.into();
        tracing::debug!(%error, "matcher session failed");
        self.state.lock().error.get_or_insert(error);
        self.close();
    }

    pub fn error(&self) -> Option<String> {
        self.state.lock().error.clone()
    }

    pub fn close(&self) {
        self.quit.send_replace(true);
    }

    pub fn is_closed(&self) -> bool {
        *self.quit.borrow()
    }

    /// Resolves once the session is closed.
    pub async fn closed(&self) {
        let mut rx = self.quit.subscribe();
        let _ = rx.wait_for(|closed| *closed).await;
    }

    /// Whether every `(bit, section)` pair has been delivered.
    pub fn is_complete(&self) -> bool {
        let state = self.state.lock();
        let sections = if self.sections.is_empty() {
            0
        } else {
            self.sections.end() - self.sections.start() + 1
        };
        state.delivered.len() as u64 == sections * self.bits.len() as u64
    }

    /// Block numbers in range whose blooms have every requested bit set.
    /// `None` until the session is complete.
    pub fn matches(&self) -> Option<Vec<u64>> {
        if !self.is_complete() {
            return None;
        }
        let state = self.state.lock();
        let mut found = Vec::new();
        for section in self.sections.clone() {
            let mut acc = vec![0xFFu8; SECTION_BITSET_LEN];
            for bit in &self.bits {
                let bits = state.delivered.get(&(*bit, section));
                for (i, byte) in acc.iter_mut().enumerate() {
                    *byte &= bits.and_then(|b| b.get(i)).copied().unwrap_or(0);
                }
            }
            for (i, byte) in acc.iter().enumerate() {
                for j in 0..8 {
                    if byte & (0x80 >> j) != 0 {
                        let number = section * BLOOM_BITS_BLOCKS + (i * 8 + j) as u64;
                        if number >= self.begin && number <= self.end {
                            found.push(number);
                        }
                    }
                }
            }
        }
        Some(found)
    }
}

/// Feed `session`'s outstanding retrievals into `mux` until the session is
/// done or closed.
///
/// A bit with fewer than `batch` pending sections is held back for up to
/// `wait` so small requests can accumulate.
pub async fn multiplex(session: Arc<MatcherSession>, batch: usize, wait: Duration, mux: mpsc::Sender<BloomRequest>) {
    let batch = batch.max(1);
    loop {
        let Some(bit) = session.allocate_retrieval() else {
            return;
        };
        if session.pending_sections(bit) < batch {
            tokio::select! {
                _ = session.closed() => return,
                _ = tokio::time::sleep(wait) => {}
            }
        }
        let sections = session.allocate_sections(bit, batch);
        if sections.is_empty() {
            continue;
        }

        let (reply, response) = oneshot::channel();
        let request = BloomRequest {
            task: Retrieval::new(bit, sections.clone()),
            reply,
        };
        tokio::select! {
            _ = session.closed() => {
                session.return_sections(bit, &sections);
                return;
            }
            sent = mux.send(request) => {
                if sent.is_err() {
                    session.return_sections(bit, &sections);
                    session.fail("bloom request channel closed");
                    return;
                }
            }
        }

        match response.await {
            Ok(result) => {
                if let Some(error) = result.error {
                    session.fail(error);
                }
                session.deliver_sections(result.bit, &result.sections, result.bitsets);
            }
            Err(_) => {
                session.fail("bloom handler dropped request");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_bitset() -> Vec<u8> {
        vec![0xFF; SECTION_BITSET_LEN]
    }

    #[test]
    fn sections_cover_block_range() {
        let session = MatcherSession::new(vec![3, 1, 3], 0, 3 * BLOOM_BITS_BLOCKS - 1);
        assert_eq!(session.allocate_retrieval(), Some(1));
        assert_eq!(session.pending_sections(1), 3);
        assert_eq!(session.allocate_sections(1, 2), vec![0, 1]);
        assert_eq!(session.pending_sections(1), 1);
    }

    #[test]
    fn inverted_range_is_empty_and_complete() {
        let session = MatcherSession::new(vec![1, 2], 3 * BLOOM_BITS_BLOCKS, 5);
        assert_eq!(session.allocate_retrieval(), None);
        assert_eq!(session.pending_sections(1), 0);
        assert!(session.is_complete());
        assert_eq!(session.matches(), Some(Vec::new()));
    }

    #[test]
    fn closed_session_allocates_nothing() {
        let session = MatcherSession::new(vec![1], 0, 10);
        session.close();
        assert_eq!(session.allocate_retrieval(), None);
    }

    #[test]
    fn matches_require_every_bit() {
        let session = MatcherSession::new(vec![1, 2], 0, 15);
        let mut only_first = vec![0u8; SECTION_BITSET_LEN];
        only_first[0] = 0b1100_0000;
        session.deliver_sections(1, &[0], vec![full_bitset()]);
        assert_eq!(session.matches(), None);
        session.deliver_sections(2, &[0], vec![only_first]);
        assert_eq!(session.matches(), Some(vec![0, 1]));
    }

    #[tokio::test]
    async fn multiplex_routes_requests_and_delivers() {
        let session = Arc::new(MatcherSession::new(vec![7], 0, 2 * BLOOM_BITS_BLOCKS - 1));
        let (tx, mut rx) = mpsc::channel::<BloomRequest>(1);

        let handler = tokio::spawn(async move {
            let mut served = 0;
            while let Some(req) = rx.recv().await {
                let mut task = req.task;
                task.bitsets = task.sections.iter().map(|_| full_bitset()).collect();
                served += task.sections.len();
                let _ = req.reply.send(task);
            }
            served
        });

        multiplex(session.clone(), 16, Duration::from_millis(1), tx).await;
        assert!(session.is_complete());
        assert_eq!(session.error(), None);
        assert_eq!(handler.await.unwrap(), 2);
    }

    #[tokio::test]
    async fn handler_error_fails_session() {
        let session = Arc::new(MatcherSession::new(vec![7], 0, 10));
        let (tx, mut rx) = mpsc::channel::<BloomRequest>(1);
        tokio::spawn(async move {
            while let Some(req) = rx.recv().await {
                let mut task = req.task;
                task.error = Some("disk on fire".into());
                let _ = req.reply.send(task);
            }
        });
        multiplex(session.clone(), 16, Duration::from_millis(1), tx).await;
        assert_eq!(session.error().as_deref(), Some("disk on fire"));
        assert!(session.is_closed());
    }

    #[tokio::test]
    async fn closed_mux_channel_fails_session() {
        let session = Arc::new(MatcherSession::new(vec![7], 0, 10));
        let (tx, rx) = mpsc::channel::<BloomRequest>(1);
        drop(rx);
        multiplex(session.clone(), 1, Duration::from_millis(1), tx).await;
        assert!(session.error().is_some());
        assert_eq!(session.pending_sections(7), 1);
    }
}
