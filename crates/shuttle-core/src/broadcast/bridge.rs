//! Thread-to-runtime hand-off for progress events.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinHandle;

use super::{ProgressEvent, SubscriberHub};

type Sender = Option<UnboundedSender<ProgressEvent>>;

/// Callable from any thread; never blocks and never returns an error.
#[derive(Default)]
pub struct ProgressBridge {
    tx: Mutex<Sender>,
}

impl ProgressBridge {
    pub fn new() -> Self {
        Self::default()
    }

    fn sender(&self) -> MutexGuard<'_, Sender> {
        self.tx.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start the drain task on `rt`, delivering into `hub`. Replaces any
    /// previous attachment; the old drain task ends once its queue empties.
    pub fn attach(&self, rt: &Handle, hub: Arc<SubscriberHub>) -> JoinHandle<()> {
        let (tx, mut rx) = mpsc::unbounded_channel::<ProgressEvent>();
        *self.sender() = Some(tx);
        rt.spawn(async move {
            while let Some(event) = rx.recv().await {
                hub.deliver(&event);
            }
            tracing::debug!("progress drain task finished");
        })
    }

    /// Stop accepting events. Already queued events are still delivered.
    pub fn detach(&self) {
        self.sender().take();
    }

    pub fn is_attached(&self) -> bool {
        self.sender().is_some()
    }

    pub fn publish(&self, event: ProgressEvent) {
        let mut guard = self.sender();
        let Some(tx) = guard.as_ref() else {
            tracing::warn!(job_id = event.job_id, "no event loop attached; progress event dropped");
            return;
        };
        if let Err(e) = tx.send(event) {
            tracing::warn!(
                job_id = e.0.job_id,
                "progress drain task gone; event dropped"
            );
            guard.take();
        }
    }
}
