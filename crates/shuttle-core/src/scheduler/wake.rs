//! Wake signal for the idle scheduler.
//!
//! The worker sleeps between polls; submitting or reordering jobs pokes it so
//! new work starts without waiting out the poll interval. Wakes coalesce: a
//! capacity-1 channel holds at most one pending signal.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TrySendError};
use std::time::Duration;

/// Cloneable handle that interrupts the scheduler's idle sleep.
#[derive(Debug, Clone)]
pub struct SchedulerWaker {
    tx: SyncSender<()>,
}

impl SchedulerWaker {
    /// Never blocks; a wake already pending absorbs this one.
    pub fn wake(&self) {
        match self.tx.try_send(()) {
            Ok(()) | Err(TrySendError::Full(())) => {}
            Err(TrySendError::Disconnected(())) => {
                tracing::debug!("scheduler wake ignored: worker gone");
            }
        }
    }
}

pub(crate) struct WakeReceiver {
    rx: Receiver<()>,
}

impl WakeReceiver {
    /// Sleep up to `timeout`, returning early if woken. Returns true if woken.
    pub(crate) fn wait(&self, timeout: Duration) -> bool {
        match self.rx.recv_timeout(timeout) {
            Ok(()) => true,
            Err(RecvTimeoutError::Timeout) => false,
            Err(RecvTimeoutError::Disconnected) => {
                // No waker left; fall back to a plain sleep so the loop never spins.
                std::thread::sleep(timeout);
                false
            }
        }
    }
}

pub(crate) fn wake_channel() -> (SchedulerWaker, WakeReceiver) {
    let (tx, rx) = mpsc::sync_channel(1);
    (SchedulerWaker { tx }, WakeReceiver { rx })
}
