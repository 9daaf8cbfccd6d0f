//! Subscriber registry with per-subscriber bounded buffers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc::{self, error::TrySendError};

use super::ProgressEvent;

type Subscribers = Vec<(u64, mpsc::Sender<ProgressEvent>)>;

/// A live subscription. Dropping the receiver unsubscribes on the next delivery.
pub struct Subscription {
    pub id: u64,
    pub rx: mpsc::Receiver<ProgressEvent>,
}

pub struct SubscriberHub {
    next_id: AtomicU64,
    buffer: usize,
    subscribers: Mutex<Subscribers>,
}

impl SubscriberHub {
    /// `buffer` events may queue per subscriber before it counts as stalled.
    pub fn new(buffer: usize) -> Self {
        Self {
            next_id: AtomicU64::new(1),
            buffer: buffer.max(1),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    fn subscribers(&self) -> MutexGuard<'_, Subscribers> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn subscribe(&self) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.buffer);
        self.subscribers().push((id, tx));
        tracing::debug!(subscriber = id, "progress subscriber added");
        Subscription { id, rx }
    }

    pub fn unsubscribe(&self, id: u64) -> bool {
        let mut subs = self.subscribers();
        let before = subs.len();
        subs.retain(|(sid, _)| *sid != id);
        subs.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers().len()
    }

    /// Hand `event` to every subscriber without waiting. Closed or full
    /// subscribers are dropped. Returns how many received it.
    pub fn deliver(&self, event: &ProgressEvent) -> usize {
        let mut subs = self.subscribers();
        let mut delivered = 0;
        subs.retain(|(id, tx)| match tx.try_send(event.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                tracing::warn!(subscriber = *id, "progress subscriber stalled; dropping it");
                false
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!(subscriber = *id, "progress subscriber gone");
                false
            }
        });
        delivered
    }
}
