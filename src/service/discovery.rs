// Discovery polling
//
// Browses for advertisements on a fixed interval and forwards every entry to
// the election through a bounded queue. mDNS is lossy and the peer may start
// after us, so a single lookup is not enough.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{CandidateEntry, DiscoveryTransport};

/// Create the discovery → election queue.
///
/// The queue holds at most `capacity` unconsumed entries. Pushing never
/// blocks: when it is full the oldest entries are dropped, which is fine
/// because the next poll round delivers them again.
pub fn candidate_queue(capacity: usize) -> (CandidateSender, CandidateReceiver) {
    let (tx, rx) = broadcast::channel(capacity.max(1));
    (CandidateSender { inner: tx }, CandidateReceiver { inner: rx })
}

/// Producer half of the candidate queue.
#[derive(Clone)]
pub struct CandidateSender {
    inner: broadcast::Sender<CandidateEntry>,
}

impl CandidateSender {
    pub fn push(&self, entry: CandidateEntry) {
        // Only fails when the election has already gone away.
        let _ = self.inner.send(entry);
    }
}

/// Consumer half of the candidate queue.
pub struct CandidateReceiver {
    inner: broadcast::Receiver<CandidateEntry>,
}

impl CandidateReceiver {
    /// Next entry, or `None` once every sender is gone and the queue is
    /// drained.
    pub async fn next(&mut self) -> Option<CandidateEntry> {
        loop {
            match self.inner.recv().await {
                Ok(entry) => return Some(entry),
                Err(RecvError::Lagged(dropped)) => {
                    debug!(dropped, "Candidate queue full, dropped oldest entries");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

/// Periodic browser for one service type.
pub struct Discoverer<T: DiscoveryTransport> {
    transport: Arc<T>,
    service_type: String,
    interval: Duration,
}

impl<T: DiscoveryTransport> Discoverer<T> {
    pub fn new(transport: Arc<T>, service_type: impl Into<String>, interval: Duration) -> Self {
        Self {
            transport,
            service_type: service_type.into(),
            interval,
        }
    }

    /// Poll until `cancel` fires. Cancellation is best-effort: a lookup that
    /// is already in flight may still deliver entries, so consumers must
    /// tolerate late entries after the rendezvous is decided.
    ///
    /// Dropping `queue` on return closes the queue for the consumer.
    pub async fn run(self, queue: CandidateSender, cancel: CancellationToken) {
        let mut round: u64 = 0;

        while !cancel.is_cancelled() {
            round += 1;

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                result = self.transport.lookup(&self.service_type) => result,
            };

            match result {
                Ok(entries) => {
                    debug!(round, found = entries.len(), "Discovery round finished");
                    for entry in entries {
                        queue.push(entry);
                    }
                }
                Err(e) => warn!(round, "Discovery round failed: {}", e),
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        debug!(rounds = round, "Discovery polling stopped");
    }
}
