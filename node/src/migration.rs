//! Background rewrite of legacy transaction lookup entries.
//!
//! Older databases stored each transaction twice: in its block and next to
//! its lookup entry. The task below strips the copies in batches, yielding
//! between batches and stopping early when cancelled. A completion marker
//! keeps it from running again.

use std::sync::Arc;
use std::time::Duration;

use huc_store::lookup::{
    delete_legacy_tx_entry, is_dedup_complete, legacy_tx_hashes, mark_dedup_complete,
    read_legacy_tx_entry, write_tx_lookup_entry, TxLookupEntry,
};
use huc_store::{Database, StoreError};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Entries rewritten between cancellation checks.
pub const MIGRATION_BATCH: usize = 10_000;

/// How the migration ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MigrationOutcome {
    Complete { converted: u64 },
    Cancelled { converted: u64 },
    Failed,
}

pub struct MigrationTask {
    cancel: watch::Sender<bool>,
    handle: JoinHandle<MigrationOutcome>,
}

impl MigrationTask {
    /// Start the migration unless the database is already upgraded.
    pub fn spawn(db: Arc<dyn Database>) -> Result<Option<Self>, StoreError> {
        if is_dedup_complete(db.as_ref())? {
            return Ok(None);
        }
        let (cancel, cancelled) = watch::channel(false);
        let handle = tokio::spawn(run(db, cancelled));
        Ok(Some(Self { cancel, handle }))
    }

    /// Ask the task to stop at the next batch boundary.
    pub fn cancel(&self) {
        let _ = self.cancel.send(true);
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Cancel and wait up to `timeout` for the task to wind down.
    pub async fn stop(self, timeout: Duration) -> Option<MigrationOutcome> {
        self.cancel();
        match tokio::time::timeout(timeout, self.handle).await {
            Ok(Ok(outcome)) => Some(outcome),
            Ok(Err(e)) => {
                tracing::error!(error = %e, "database migration task panicked");
                None
            }
            Err(_) => {
                tracing::warn!("database migration did not stop in time");
                None
            }
        }
    }
}

async fn run(db: Arc<dyn Database>, cancelled: watch::Receiver<bool>) -> MigrationOutcome {
    match migrate(db.as_ref(), &cancelled).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(error = %e, "database deduplication failed");
            MigrationOutcome::Failed
        }
    }
}

async fn migrate(db: &dyn Database, cancelled: &watch::Receiver<bool>) -> Result<MigrationOutcome, StoreError> {
    let hashes = legacy_tx_hashes(db)?;
    if !hashes.is_empty() {
        tracing::warn!(entries = hashes.len(), "Upgrading database to use lookup entries");
    }

    let mut converted = 0u64;
    for batch in hashes.chunks(MIGRATION_BATCH) {
        if *cancelled.borrow() {
            tracing::warn!(converted, "Database deduplication interrupted");
            return Ok(MigrationOutcome::Cancelled { converted });
        }
        for hash in batch {
            let Some(legacy) = read_legacy_tx_entry(db, hash)? else {
                continue;
            };
            let entry = TxLookupEntry {
                block_hash: legacy.block_hash,
                block_number: legacy.block_number,
                index: legacy.index,
            };
            write_tx_lookup_entry(db, hash, &entry)?;
            delete_legacy_tx_entry(db, hash)?;
            converted += 1;
        }
        tracing::info!(converted, "Deduplicating database entries");
        tokio::task::yield_now().await;
    }

    mark_dedup_complete(db)?;
    tracing::info!(converted, "Database deduplication successful");
    Ok(MigrationOutcome::Complete { converted })
}
