//! Request-side operations on the job queue.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::job_db::db::unix_timestamp;
use crate::job_db::{Job, JobDb, JobId, JobStatus, PriorityTier, StatsReport};
use crate::scheduler::SchedulerWaker;

use super::paths;
use super::registry::CancellationRegistry;
use super::{ControlError, CANCELLED_BY_USER};

/// What a cancel request did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The job was still queued and is now cancelled.
    Cancelled,
    /// The job is running; the engine stops it at the next chunk boundary.
    Requested,
    /// Nothing to do: the job already reached this terminal state.
    AlreadyFinished(JobStatus),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CancelAllSummary {
    /// Queued jobs moved straight to cancelled.
    pub cancelled: u64,
    /// Running jobs flagged for cancellation.
    pub requested: Vec<JobId>,
}

/// Handle used by request handlers (CLI, control socket) to manage jobs.
#[derive(Clone)]
pub struct JobControl {
    db: JobDb,
    registry: Arc<CancellationRegistry>,
    waker: Option<SchedulerWaker>,
    source_root: Option<PathBuf>,
    destination_root: Option<PathBuf>,
}

impl JobControl {
    pub fn new(db: JobDb, registry: Arc<CancellationRegistry>) -> Self {
        Self {
            db,
            registry,
            waker: None,
            source_root: None,
            destination_root: None,
        }
    }

    /// Poke this scheduler whenever the queue gains runnable work.
    pub fn with_waker(mut self, waker: SchedulerWaker) -> Self {
        self.waker = Some(waker);
        self
    }

    pub fn with_roots(mut self, source_root: Option<PathBuf>, destination_root: Option<PathBuf>) -> Self {
        self.source_root = source_root;
        self.destination_root = destination_root;
        self
    }

    pub fn db(&self) -> &JobDb {
        &self.db
    }

    pub fn registry(&self) -> &Arc<CancellationRegistry> {
        &self.registry
    }

    /// Interrupt the scheduler's idle wait, if this handle has one.
    pub fn wake_scheduler(&self) {
        if let Some(waker) = &self.waker {
            waker.wake();
        }
    }

    /// Queue a new transfer. Paths are validated and normalized here; whether
    /// the source exists is only checked when the job runs. An existing source
    /// submitted onto an existing directory goes inside it under its own name.
    pub async fn submit(
        &self,
        source: &str,
        destination: &str,
        tier: PriorityTier,
    ) -> Result<Job, ControlError> {
        let src = paths::resolve(source, self.source_root.as_deref(), "source")?;
        let dst = paths::resolve(destination, self.destination_root.as_deref(), "destination")?;
        let dst = copy_into(&src, dst).await;
        let id = self
            .db
            .add_job(path_str(&src), path_str(&dst), tier.value())
            .await?;
        tracing::info!(
            job_id = id,
            priority = tier.value(),
            "queued {} -> {}",
            src.display(),
            dst.display()
        );
        self.wake_scheduler();
        self.get(id).await
    }

    pub async fn get(&self, id: JobId) -> Result<Job, ControlError> {
        self.db
            .get_job(id)
            .await?
            .ok_or(ControlError::NotFound(id))
    }

    /// Processing and queued jobs in execution order.
    pub async fn list_queue(&self) -> Result<Vec<Job>, ControlError> {
        Ok(self.db.list_queue().await?)
    }

    /// Terminal jobs, newest first.
    pub async fn list_history(&self, limit: u32, offset: u32) -> Result<Vec<Job>, ControlError> {
        Ok(self.db.list_history(limit, offset).await?)
    }

    pub async fn cancel(&self, id: JobId) -> Result<CancelOutcome, ControlError> {
        if self.db.cancel_if_queued(id, CANCELLED_BY_USER).await? {
            tracing::info!(job_id = id, "cancelled queued job");
            return Ok(CancelOutcome::Cancelled);
        }

        match self.db.job_status(id).await? {
            None => Err(ControlError::NotFound(id)),
            // Lost a race with the claim between the two queries.
            Some(JobStatus::Queued) | Some(JobStatus::Processing) => {
                if let Some(status) = self.flag_running(id).await? {
                    return Ok(CancelOutcome::AlreadyFinished(status));
                }
                tracing::info!(job_id = id, "cancellation requested for running job");
                Ok(CancelOutcome::Requested)
            }
            Some(status) => Ok(CancelOutcome::AlreadyFinished(status)),
        }
    }

    /// Transfer statistics as of now.
    pub async fn stats(&self) -> Result<StatsReport, ControlError> {
        Ok(self.db.stats_report(unix_timestamp()).await?)
    }

    /// Cancel every queued job and flag every running one.
    pub async fn cancel_all(&self) -> Result<CancelAllSummary, ControlError> {
        let cancelled = self.db.cancel_all_queued(CANCELLED_BY_USER).await?;
        let mut requested = Vec::new();
        for job in self.db.list_queue().await? {
            if job.status != JobStatus::Processing {
                continue;
            }
            if self.flag_running(job.id).await?.is_none() {
                requested.push(job.id);
            }
        }
        tracing::info!(
            cancelled,
            running = requested.len(),
            "cancel-all processed"
        );
        Ok(CancelAllSummary {
            cancelled,
            requested,
        })
    }

    /// Change the priority tier of a queued job.
    pub async fn set_priority(&self, id: JobId, tier: PriorityTier) -> Result<Job, ControlError> {
        if !self.db.set_priority_if_queued(id, tier.value()).await? {
            return Err(self.not_queued(id, "change priority of").await);
        }
        tracing::info!(job_id = id, priority = tier.value(), "priority updated");
        self.wake_scheduler();
        self.get(id).await
    }

    /// Put the given queued jobs at the front of the queue, in this order.
    /// Ids that are unknown or not queued are skipped. Returns how many jobs moved.
    pub async fn reorder(&self, ids: &[JobId]) -> Result<u64, ControlError> {
        if ids.is_empty() {
            return Err(ControlError::EmptyReorder);
        }
        let changed = self.db.reorder_queued(ids).await?;
        if changed == 0 {
            return Err(ControlError::NoQueuedJobs);
        }
        tracing::info!(changed, "queue reordered");
        self.wake_scheduler();
        Ok(changed)
    }

    /// Queue a fresh copy of a failed job. The failed row stays as history.
    pub async fn retry(&self, id: JobId) -> Result<Job, ControlError> {
        let new_id = self
            .db
            .retry_failed(id, PriorityTier::default().value())
            .await?;
        let Some(new_id) = new_id else {
            return Err(match self.db.job_status(id).await? {
                None => ControlError::NotFound(id),
                Some(status) => ControlError::InvalidState {
                    id,
                    status,
                    action: "retry",
                    expected: "failed",
                },
            });
        };
        tracing::info!(job_id = new_id, retry_of = id, "failed job requeued");
        self.wake_scheduler();
        self.get(new_id).await
    }

    /// Put `id` in the registry. The job may have finished while we were
    /// flagging it: then the entry is withdrawn and the final status returned.
    async fn flag_running(&self, id: JobId) -> Result<Option<JobStatus>, ControlError> {
        self.registry.request(id);
        match self.db.job_status(id).await? {
            Some(status) if status.is_terminal() => {
                self.registry.clear(id);
                Ok(Some(status))
            }
            _ => Ok(None),
        }
    }

    async fn not_queued(&self, id: JobId, action: &'static str) -> ControlError {
        match self.db.job_status(id).await {
            Ok(None) => ControlError::NotFound(id),
            Ok(Some(status)) => ControlError::InvalidState {
                id,
                status,
                action,
                expected: "queued",
            },
            Err(e) => ControlError::Store(e),
        }
    }
}

/// `add /in/Avatar /library/Movies` means `/library/Movies/Avatar`.
async fn copy_into(src: &Path, dst: PathBuf) -> PathBuf {
    let exists = tokio::fs::metadata(src).await.is_ok();
    let dst_is_dir = tokio::fs::metadata(&dst)
        .await
        .map(|meta| meta.is_dir())
        .unwrap_or(false);
    match src.file_name() {
        Some(name) if exists && dst_is_dir => dst.join(name),
        _ => dst,
    }
}

// `paths::resolve` only returns UTF-8 paths.
fn path_str(path: &Path) -> &str {
    path.to_str().unwrap_or_default()
}
