//! Event feeds and the legacy type-multiplexed event bus.
//!
//! A [`Feed`] fans each value out to every live [`Subscription`]. Delivery
//! is in send order per subscriber; a subscriber that falls more than the
//! feed capacity behind skips the oldest events.

use huc_types::{Block, Hash, Log, Transaction};
use parking_lot::Mutex;
use tokio::sync::broadcast;

/// Default per-subscriber buffer.
pub const DEFAULT_FEED_CAPACITY: usize = 256;

#[derive(Clone, Debug)]
pub struct ChainEvent {
    pub block: Block,
    pub hash: Hash,
    pub logs: Vec<Log>,
}

#[derive(Clone, Debug)]
pub struct ChainHeadEvent {
    pub block: Block,
}

#[derive(Clone, Debug)]
pub struct ChainSideEvent {
    pub block: Block,
}

#[derive(Clone, Debug)]
pub struct RemovedLogsEvent {
    pub logs: Vec<Log>,
}

#[derive(Clone, Debug)]
pub struct TxPreEvent {
    pub tx: Transaction,
}

/// One-to-many event stream.
pub struct Feed<T> {
    sender: broadcast::Sender<T>,
}

impl<T: Clone + Send + 'static> Feed<T> {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Deliver `value` to every subscriber, returning how many received it.
    pub fn send(&self, value: T) -> usize {
        self.sender.send(value).unwrap_or(0)
    }

    pub fn subscribe(&self) -> Subscription<T> {
        Subscription {
            receiver: Some(self.sender.subscribe()),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl<T: Clone + Send + 'static> Default for Feed<T> {
    fn default() -> Self {
        Self::new(DEFAULT_FEED_CAPACITY)
    }
}

/// A live subscription. Dropping it or calling [`unsubscribe`](Self::unsubscribe)
/// cancels it.
pub struct Subscription<T> {
    receiver: Option<broadcast::Receiver<T>>,
}

impl<T: Clone> Subscription<T> {
    /// A subscription that never yields anything.
    pub fn closed() -> Self {
        Self { receiver: None }
    }

    /// Wait for the next event. `None` once the feed is gone or the
    /// subscription was cancelled.
    pub async fn recv(&mut self) -> Option<T> {
        let receiver = self.receiver.as_mut()?;
        loop {
            match receiver.recv().await {
                Ok(value) => return Some(value),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "subscriber lagged, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    self.receiver = None;
                    return None;
                }
            }
        }
    }

    /// The next event if one is already queued.
    pub fn try_recv(&mut self) -> Option<T> {
        let receiver = self.receiver.as_mut()?;
        loop {
            match receiver.try_recv() {
                Ok(value) => return Some(value),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }

    pub fn unsubscribe(&mut self) {
        self.receiver = None;
    }

    pub fn is_active(&self) -> bool {
        self.receiver.is_some()
    }
}

/// Events carried on the node-wide mux.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MuxEvent {
    SyncStarted,
    SyncDone,
    SyncFailed(String),
    NewMinedBlock(Hash),
}

/// Node-wide event bus. After [`stop`](Self::stop) posts are dropped and
/// every subscription ends.
pub struct EventMux {
    sender: Mutex<Option<broadcast::Sender<MuxEvent>>>,
}

impl EventMux {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(DEFAULT_FEED_CAPACITY);
        Self {
            sender: Mutex::new(Some(sender)),
        }
    }

    /// Post an event. Returns `false` once the mux is stopped.
    pub fn post(&self, event: MuxEvent) -> bool {
        match self.sender.lock().as_ref() {
            Some(sender) => {
                let _ = sender.send(event);
                true
            }
            None => false,
        }
    }

    pub fn subscribe(&self) -> Subscription<MuxEvent> {
        Subscription {
            receiver: self.sender.lock().as_ref().map(|s| s.subscribe()),
        }
    }

    pub fn stop(&self) {
        self.sender.lock().take();
    }

    pub fn is_stopped(&self) -> bool {
        self.sender.lock().is_none()
    }
}

impl Default for EventMux {
    fn default() -> Self {
        Self::new()
    }
}
