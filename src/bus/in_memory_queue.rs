//! In-memory queues for tests and single-process setups.
//!
//! Stands in for a broker: envelopes are appended to named queues and read
//! back in order. Closing the queue makes every send fail with
//! `PublishError::ConnectionFailed`, which is how tests simulate an outage.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::Notify;

use super::Envelope;
use crate::publisher::PublishError;

#[derive(Default)]
struct Queues {
    /// Envelopes per queue, append-only.
    log: HashMap<String, Vec<Envelope>>,
    /// Read position per queue.
    position: HashMap<String, usize>,
}

/// Named in-memory queues.
///
/// Cheap to clone; clones share the same queues.
///
/// ## Example
///
/// ```
/// use herald::bus::{Envelope, InMemoryQueue};
///
/// let queue = InMemoryQueue::new();
/// queue.send("orders", Envelope::new("m-1", "OrderPlaced", vec![])).unwrap();
///
/// assert_eq!(queue.len("orders"), 1);
/// assert_eq!(queue.try_recv("orders").unwrap().id, "m-1");
/// assert!(queue.try_recv("orders").is_none());
/// ```
#[derive(Clone, Default)]
pub struct InMemoryQueue {
    queues: Arc<Mutex<Queues>>,
    closed: Arc<AtomicBool>,
    arrivals: Arc<Notify>,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Queues> {
        self.queues.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append an envelope to `queue`.
    pub fn send(&self, queue: &str, envelope: Envelope) -> Result<(), PublishError> {
        if self.is_closed() {
            return Err(PublishError::ConnectionFailed(format!("queue {queue} is closed")));
        }
        self.lock()
            .log
            .entry(queue.to_string())
            .or_default()
            .push(envelope);
        self.arrivals.notify_waiters();
        Ok(())
    }

    /// Next unread envelope of `queue`, if any.
    pub fn try_recv(&self, queue: &str) -> Option<Envelope> {
        let mut guard = self.lock();
        let Queues { log, position } = &mut *guard;
        let pos = position.entry(queue.to_string()).or_default();
        let envelope = log.get(queue)?.get(*pos)?.clone();
        *pos += 1;
        Some(envelope)
    }

    /// Waits for the next unread envelope of `queue`.
    pub async fn recv(&self, queue: &str) -> Envelope {
        loop {
            let arrived = self.arrivals.notified();
            if let Some(envelope) = self.try_recv(queue) {
                return envelope;
            }
            arrived.await;
        }
    }

    /// All envelopes ever sent to `queue`, read or not.
    pub fn envelopes(&self, queue: &str) -> Vec<Envelope> {
        self.lock().log.get(queue).cloned().unwrap_or_default()
    }

    /// Message type names sent to `queue`, in order.
    pub fn message_types(&self, queue: &str) -> Vec<String> {
        self.lock()
            .log
            .get(queue)
            .map(|log| log.iter().map(|e| e.message_type.clone()).collect())
            .unwrap_or_default()
    }

    pub fn len(&self, queue: &str) -> usize {
        self.lock().log.get(queue).map_or(0, Vec::len)
    }

    pub fn is_empty(&self, queue: &str) -> bool {
        self.len(queue) == 0
    }

    /// Names of queues that received at least one envelope.
    pub fn queue_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.lock().log.keys().cloned().collect();
        names.sort();
        names
    }

    /// Simulate a broker outage: sends fail until [`reopen`](Self::reopen).
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn reopen(&self) {
        self.closed.store(false, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Drop every queue and read position (useful for test cleanup).
    pub fn clear(&self) {
        let mut guard = self.lock();
        guard.log.clear();
        guard.position.clear();
    }
}
