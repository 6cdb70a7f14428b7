//! Bloom-bit retrieval handlers and per-session filter workers.
//!
//! The handlers are a fixed pool sharing one request receiver. Each request
//! names a bloom bit and a list of sections; the handler reads the stored
//! bit vector of every section and replies on the request's own channel.

use std::sync::Arc;
use std::time::Duration;

use huc_core::{multiplex, BloomRequest, MatcherSession};
use huc_store::bloombits::read_bloom_bits;
use huc_store::chain::read_canonical_hash;
use huc_store::{Database, StoreError};
use huc_types::params::BLOOM_BITS_BLOCKS;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::metrics::NodeMetrics;
use crate::shutdown::ShutdownController;

/// Handler tasks serving retrieval requests.
pub const BLOOM_SERVICE_THREADS: usize = 16;

/// Multiplexer tasks per filter session.
pub const BLOOM_FILTER_THREADS: usize = 3;

/// Sections fetched per request.
pub const BLOOM_RETRIEVAL_BATCH: usize = 16;

/// How long a multiplexer waits for a batch to fill before sending a
/// partial one.
pub const BLOOM_RETRIEVAL_WAIT: Duration = Duration::ZERO;

/// Spawn the handler pool. Handlers exit on shutdown or when every sender
/// is dropped.
pub fn start_bloom_handlers(
    db: Arc<dyn Database>,
    requests: mpsc::Receiver<BloomRequest>,
    shutdown: &ShutdownController,
    metrics: Arc<NodeMetrics>,
) -> Vec<JoinHandle<()>> {
    let requests = Arc::new(Mutex::new(requests));
    (0..BLOOM_SERVICE_THREADS)
        .map(|id| {
            let requests = Arc::clone(&requests);
            let db = Arc::clone(&db);
            let metrics = Arc::clone(&metrics);
            let mut shutdown = shutdown.subscribe();
            tokio::spawn(async move {
                loop {
                    let next = tokio::select! {
                        _ = shutdown.recv() => None,
                        request = async { requests.lock().await.recv().await } => request,
                    };
                    let Some(request) = next else { break };
                    serve(db.as_ref(), request, &metrics);
                }
                tracing::trace!(handler = id, "bloom handler exited");
            })
        })
        .collect()
}

fn serve(db: &dyn Database, request: BloomRequest, metrics: &NodeMetrics) {
    let mut task = request.task;
    match fetch(db, task.bit, &task.sections) {
        Ok(bitsets) => task.bitsets = bitsets,
        Err(e) => {
            metrics.bloom_errors.inc();
            tracing::debug!(bit = task.bit, error = %e, "bloom retrieval failed");
            task.error = Some(e.to_string());
        }
    }
    metrics.bloom_requests.inc();
    let _ = request.reply.send(task);
}

fn fetch(db: &dyn Database, bit: u32, sections: &[u64]) -> Result<Vec<Vec<u8>>, StoreError> {
    sections
        .iter()
        .map(|&section| {
            let last = (section + 1) * BLOOM_BITS_BLOCKS - 1;
            let head = read_canonical_hash(db, last)?
                .ok_or_else(|| StoreError::NotFound(format!("canonical hash #{last}")))?;
            read_bloom_bits(db, bit, section, &head)?
                .ok_or_else(|| StoreError::NotFound(format!("bloom bits {bit} of section {section}")))
        })
        .collect()
}

/// The multiplexer tasks working for one filter session.
pub struct FilterWorkers {
    session: Arc<MatcherSession>,
    handles: Vec<JoinHandle<()>>,
}

impl FilterWorkers {
    /// Start [`BLOOM_FILTER_THREADS`] multiplexers feeding `requests`.
    pub fn spawn(session: Arc<MatcherSession>, requests: mpsc::Sender<BloomRequest>) -> Self {
        let handles = (0..BLOOM_FILTER_THREADS)
            .map(|_| {
                tokio::spawn(multiplex(
                    Arc::clone(&session),
                    BLOOM_RETRIEVAL_BATCH,
                    BLOOM_RETRIEVAL_WAIT,
                    requests.clone(),
                ))
            })
            .collect();
        Self { session, handles }
    }

    pub fn session(&self) -> &Arc<MatcherSession> {
        &self.session
    }

    /// Wait for every multiplexer to finish.
    pub async fn join(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "filter worker failed");
            }
        }
    }

    /// Close the session and wait for the workers.
    pub async fn cancel(self) {
        self.session.close();
        self.join().await;
    }
}
