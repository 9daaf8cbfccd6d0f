//! Worker thread lifecycle and the claim/run loop.

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::Result;

use super::wake::{wake_channel, SchedulerWaker, WakeReceiver};
use crate::config::ShuttleConfig;
use crate::copy::CopyEngine;

#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub poll_interval: Duration,
    pub fault_backoff: Duration,
    pub stop_timeout: Duration,
}

impl SchedulerSettings {
    pub fn from_config(cfg: &ShuttleConfig) -> Self {
        Self {
            poll_interval: cfg.poll_interval(),
            fault_backoff: cfg.fault_backoff(),
            stop_timeout: cfg.stop_timeout(),
        }
    }
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self::from_config(&ShuttleConfig::default())
    }
}

/// Claim the next queued job and run it to completion. Returns false when the
/// queue was empty.
pub fn run_next_job(engine: &CopyEngine) -> Result<bool> {
    let Some(job) = engine.db().claim_next_queued_job()? else {
        return Ok(false);
    };
    let id = job.id;
    tracing::debug!(job_id = id, priority = job.priority, "claimed job");
    let status = engine.run_job(job)?;
    tracing::debug!(job_id = id, %status, "job finished");
    Ok(true)
}

/// Handle to the running worker thread.
pub struct Scheduler {
    running: Arc<AtomicBool>,
    waker: SchedulerWaker,
    exited: Receiver<()>,
    handle: Option<JoinHandle<()>>,
    stop_timeout: Duration,
}

impl Scheduler {
    /// Spawn the worker thread. Call from outside the async runtime's worker
    /// threads or from a context where blocking in `block_on` is allowed: the
    /// engine drives the store through the runtime handle.
    pub fn start(engine: CopyEngine, settings: SchedulerSettings) -> io::Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let (waker, wake_rx) = wake_channel();
        let (exit_tx, exited) = mpsc::channel();

        let handle = thread::Builder::new()
            .name("shuttle-worker".to_string())
            .spawn({
                let running = Arc::clone(&running);
                let settings = settings.clone();
                move || {
                    let _guard = ExitGuard(exit_tx);
                    worker_loop(&engine, &running, &wake_rx, &settings);
                }
            })?;
        tracing::info!("scheduler started");

        Ok(Self {
            running,
            waker,
            exited,
            handle: Some(handle),
            stop_timeout: settings.stop_timeout,
        })
    }

    pub fn waker(&self) -> SchedulerWaker {
        self.waker.clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Ask the worker to exit and wait up to the stop timeout. A job in flight
    /// is allowed to finish. Returns true if the thread was joined.
    pub fn stop(mut self) -> bool {
        self.running.store(false, Ordering::SeqCst);
        self.waker.wake();
        let Some(handle) = self.handle.take() else {
            return true;
        };
        match self.exited.recv_timeout(self.stop_timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if handle.join().is_err() {
                    tracing::warn!("scheduler thread panicked on exit");
                }
                tracing::info!("scheduler stopped");
                true
            }
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!(
                    "scheduler did not stop within {:?}; leaving it to finish its job",
                    self.stop_timeout
                );
                false
            }
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.waker.wake();
    }
}

/// Signals `stop` when the worker function returns or unwinds.
struct ExitGuard(Sender<()>);

impl Drop for ExitGuard {
    fn drop(&mut self) {
        let _ = self.0.send(());
    }
}

fn worker_loop(
    engine: &CopyEngine,
    running: &AtomicBool,
    wake_rx: &WakeReceiver,
    settings: &SchedulerSettings,
) {
    while running.load(Ordering::SeqCst) {
        match panic::catch_unwind(AssertUnwindSafe(|| run_next_job(engine))) {
            Ok(Ok(true)) => {}
            Ok(Ok(false)) => {
                wake_rx.wait(settings.poll_interval);
            }
            Ok(Err(e)) => {
                tracing::error!("scheduler iteration failed: {:#}", e);
                wake_rx.wait(settings.fault_backoff);
            }
            Err(panic) => {
                tracing::error!("scheduler iteration panicked: {}", panic_message(&panic));
                wake_rx.wait(settings.fault_backoff);
            }
        }
    }
    tracing::debug!("scheduler loop exited");
}

fn panic_message(panic: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
