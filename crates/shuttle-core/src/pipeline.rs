//! Process-level wiring: store, registry, engine, scheduler and broadcast.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::broadcast::{ProgressBridge, SubscriberHub};
use crate::config::ShuttleConfig;
use crate::control::{CancellationRegistry, JobControl};
use crate::copy::{CopyEngine, EngineSettings};
use crate::instance::InstanceLock;
use crate::job_db::{BlockingJobDb, JobDb};
use crate::notify;
use crate::scheduler::{Scheduler, SchedulerSettings};

/// Message stored on jobs a previous process left mid-transfer.
pub const INTERRUPTED_MESSAGE: &str = "Interrupted: shuttle stopped during the transfer";

/// A running transfer pipeline. Must be started from a multi-thread tokio
/// runtime: the worker thread blocks on the runtime handle for store calls.
pub struct Pipeline {
    control: JobControl,
    hub: Arc<SubscriberHub>,
    bridge: Arc<ProgressBridge>,
    drain: JoinHandle<()>,
    scheduler: Scheduler,
    // Dropped last, after the worker has stopped.
    _lock: Option<InstanceLock>,
}

impl Pipeline {
    /// Fails with [`InstanceError::AlreadyRunning`](crate::instance::InstanceError)
    /// when another pipeline owns the same database file. Nothing is touched
    /// in that case: recovery and scheduling only happen under the lock.
    pub async fn start(cfg: &ShuttleConfig, db: JobDb) -> Result<Self> {
        let lock = match db.path() {
            Some(path) => {
                let lock = InstanceLock::acquire(InstanceLock::path_for(path))?;
                tracing::debug!(path = %lock.path().display(), "worker lock held");
                Some(lock)
            }
            None => None,
        };

        let stranded = db.fail_stranded_jobs(INTERRUPTED_MESSAGE).await?;
        if stranded > 0 {
            tracing::warn!(count = stranded, "marked interrupted jobs as failed");
        }

        let rt = Handle::current();
        let registry = Arc::new(CancellationRegistry::new());
        let hub = Arc::new(SubscriberHub::new(cfg.subscriber_buffer));
        let bridge = Arc::new(ProgressBridge::new());
        let drain = bridge.attach(&rt, Arc::clone(&hub));
        let notifier = notify::from_config(&cfg.notify, rt.clone());

        let engine = CopyEngine::new(
            BlockingJobDb::new(db.clone(), rt),
            Arc::clone(&registry),
            Arc::clone(&bridge),
            notifier,
            EngineSettings::from_config(cfg),
        );
        let scheduler = Scheduler::start(engine, SchedulerSettings::from_config(cfg))
            .context("spawn scheduler thread")?;

        let control = JobControl::new(db, registry)
            .with_waker(scheduler.waker())
            .with_roots(cfg.source_root.clone(), cfg.destination_root.clone());

        Ok(Self {
            control,
            hub,
            bridge,
            drain,
            scheduler,
            _lock: lock,
        })
    }

    pub fn control(&self) -> &JobControl {
        &self.control
    }

    pub fn hub(&self) -> &Arc<SubscriberHub> {
        &self.hub
    }

    /// Stop the worker (letting a running job finish within the stop
    /// timeout), then flush pending events to subscribers.
    pub async fn shutdown(self) -> Result<()> {
        let Pipeline {
            bridge,
            drain,
            scheduler,
            _lock,
            ..
        } = self;
        let joined = tokio::task::spawn_blocking(move || scheduler.stop())
            .await
            .context("scheduler stop task")?;
        if !joined {
            tracing::warn!("shutting down with a job still running");
        }
        bridge.detach();
        if let Err(e) = drain.await {
            tracing::warn!("progress drain task ended abnormally: {}", e);
        }
        Ok(())
    }
}
