//! Copy execution engine.
//!
//! Runs one claimed job to a terminal state on the worker thread:
//! pre-flight → size → destination prep → chunked transfer → final write.
//! Progress is persisted and broadcast only when it moved by at least
//! `max(1% of total, 1 MiB)`. Store writes go through [`BlockingJobDb`].

mod cleanup;
mod error;
mod progress;
mod size;
mod transfer;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;

use crate::broadcast::{ProgressBridge, ProgressEvent};
use crate::config::ShuttleConfig;
use crate::control::{CancellationRegistry, CANCELLED_BY_USER};
use crate::job_db::{BlockingJobDb, Job, JobId, JobStatus};
use crate::notify::{JobOutcome, TerminalNotifier};

pub use cleanup::remove_path_best_effort;
pub use error::CopyError;
pub use progress::{percent_of, ProgressSample, ProgressTracker};
pub use size::total_size;
pub use transfer::{copy_file_chunked, copy_metadata, copy_tree, CopyObserver};

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub chunk_size: usize,
    pub max_error_len: usize,
    /// Remove partial output on failure as well as on cancellation.
    pub cleanup_on_failure: bool,
}

impl EngineSettings {
    pub fn from_config(cfg: &ShuttleConfig) -> Self {
        Self {
            chunk_size: cfg.chunk_size(),
            max_error_len: cfg.max_error_len,
            cleanup_on_failure: cfg.cleanup_on_failure,
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from_config(&ShuttleConfig::default())
    }
}

pub struct CopyEngine {
    db: BlockingJobDb,
    registry: Arc<CancellationRegistry>,
    bridge: Arc<ProgressBridge>,
    notifier: Arc<dyn TerminalNotifier>,
    settings: EngineSettings,
}

impl CopyEngine {
    pub fn new(
        db: BlockingJobDb,
        registry: Arc<CancellationRegistry>,
        bridge: Arc<ProgressBridge>,
        notifier: Arc<dyn TerminalNotifier>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            db,
            registry,
            bridge,
            notifier,
            settings,
        }
    }

    pub fn db(&self) -> &BlockingJobDb {
        &self.db
    }

    /// Run a claimed (processing) job to its terminal state. Transfer
    /// problems end up in the job row; Err means the store itself failed.
    pub fn run_job(&self, job: Job) -> Result<JobStatus> {
        let id = job.id;
        self.bridge.publish(ProgressEvent::from_job(&job));

        if self.registry.is_requested(id) {
            tracing::info!(job_id = id, "cancelled before transfer started");
            return self.finish(id, JobStatus::Cancelled, Some(CANCELLED_BY_USER.to_string()));
        }

        let src = PathBuf::from(&job.source_path);
        let dst = PathBuf::from(&job.destination_path);
        tracing::info!(job_id = id, "copy started: {} -> {}", src.display(), dst.display());

        let mut target = None;
        let result = self.execute(id, &src, &dst, &mut target);
        match result {
            Ok(bytes) => {
                tracing::debug!(job_id = id, bytes, "transfer finished");
                self.finish(id, JobStatus::Completed, None)
            }
            Err(CopyError::Cancelled) => {
                if let Some(target) = &target {
                    remove_path_best_effort(target);
                }
                tracing::info!(job_id = id, "copy cancelled");
                self.finish(id, JobStatus::Cancelled, Some(CANCELLED_BY_USER.to_string()))
            }
            Err(e) => {
                if self.settings.cleanup_on_failure && !e.wrote_nothing() {
                    if let Some(target) = &target {
                        remove_path_best_effort(target);
                    }
                }
                tracing::error!(job_id = id, "copy failed: {}", e);
                let message = truncate_chars(&e.to_string(), self.settings.max_error_len);
                self.finish(id, JobStatus::Failed, Some(message))
            }
        }
    }

    /// Everything between pre-flight and the last byte. `target` is set as
    /// soon as the engine may have written something there.
    fn execute(
        &self,
        id: JobId,
        src: &Path,
        dst: &Path,
        target: &mut Option<PathBuf>,
    ) -> Result<u64, CopyError> {
        let src_meta = match fs::metadata(src) {
            Ok(meta) => meta,
            Err(_) => return Err(CopyError::SourceMissing(src.to_path_buf())),
        };

        let total = total_size(src);
        if let Err(e) = self.db.set_total_size(id, total) {
            tracing::warn!(job_id = id, "store total size failed: {:#}", e);
        }
        tracing::debug!(job_id = id, total, "source size computed");

        let resolved = resolve_target(src, dst, src_meta.is_dir())?;
        if let Some(parent) = resolved.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| CopyError::io(format!("create dir {}", parent.display()), e))?;
        }
        if src_meta.is_dir() && fs::symlink_metadata(&resolved).is_ok() {
            tracing::info!(job_id = id, path = %resolved.display(), "replacing existing destination");
            if !remove_path_best_effort(&resolved) {
                return Err(CopyError::io(
                    format!("remove existing destination {}", resolved.display()),
                    std::io::Error::other("destination could not be removed"),
                ));
            }
        }
        *target = Some(resolved.clone());

        let mut observer = JobObserver {
            job_id: id,
            db: &self.db,
            registry: &self.registry,
            bridge: &self.bridge,
            tracker: ProgressTracker::new(total),
            total,
        };
        if src_meta.is_dir() {
            copy_tree(src, &resolved, self.settings.chunk_size, &mut observer)
        } else {
            copy_file_chunked(src, &resolved, self.settings.chunk_size, &mut observer)
        }
    }

    /// Store the terminal state, then tell the world.
    fn finish(&self, id: JobId, status: JobStatus, message: Option<String>) -> Result<JobStatus> {
        let stored = match status {
            JobStatus::Completed => self.db.mark_completed(id),
            JobStatus::Cancelled => self
                .db
                .mark_cancelled(id, message.as_deref().unwrap_or(CANCELLED_BY_USER)),
            _ => self
                .db
                .mark_failed(id, message.as_deref().unwrap_or("copy failed")),
        };
        self.registry.clear(id);
        stored?;

        match self.db.get_job(id)? {
            Some(job) => {
                self.bridge.publish(ProgressEvent::from_job(&job));
                self.notifier.notify(JobOutcome::from_job(&job));
            }
            None => tracing::warn!(job_id = id, "job row vanished before final event"),
        }
        Ok(status)
    }
}

/// Where the data actually lands. A file copied onto an existing directory
/// goes inside it under its own name.
fn resolve_target(src: &Path, dst: &Path, src_is_dir: bool) -> Result<PathBuf, CopyError> {
    let target = if !src_is_dir && dst.is_dir() {
        match src.file_name() {
            Some(name) => dst.join(name),
            None => dst.to_path_buf(),
        }
    } else {
        dst.to_path_buf()
    };

    let src_real = fs::canonicalize(src).unwrap_or_else(|_| src.to_path_buf());
    let target_real = canonical_target(&target);
    if target_real == src_real {
        return Err(CopyError::DestinationIsSource(target));
    }
    if src_is_dir && target_real.starts_with(&src_real) {
        return Err(CopyError::DestinationInsideSource {
            source_dir: src.to_path_buf(),
            destination: target,
        });
    }
    Ok(target)
}

/// Canonical form of a path that may not exist yet: canonicalize the nearest
/// existing ancestor and re-append the rest.
fn canonical_target(path: &Path) -> PathBuf {
    let mut existing = path;
    let mut rest = Vec::new();
    loop {
        if let Ok(real) = fs::canonicalize(existing) {
            return rest.iter().rev().fold(real, |acc, part| acc.join(part));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                rest.push(name.to_os_string());
                existing = parent;
            }
            _ => return path.to_path_buf(),
        }
    }
}

/// Truncate to at most `max` chars without splitting a character.
fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

struct JobObserver<'a> {
    job_id: JobId,
    db: &'a BlockingJobDb,
    registry: &'a CancellationRegistry,
    bridge: &'a ProgressBridge,
    tracker: ProgressTracker,
    total: u64,
}

impl CopyObserver for JobObserver<'_> {
    fn is_cancelled(&self) -> bool {
        self.registry.is_requested(self.job_id)
    }

    fn on_chunk(&mut self, file: &Path, file_copied: u64, _file_size: u64) {
        let Some(sample) = self.tracker.record(file, file_copied) else {
            return;
        };
        if let Err(e) = self
            .db
            .update_progress(self.job_id, sample.copied, sample.percent)
        {
            tracing::warn!(job_id = self.job_id, "store progress failed: {:#}", e);
        }
        self.bridge.publish(ProgressEvent {
            job_id: self.job_id,
            status: JobStatus::Processing,
            progress_percent: sample.percent,
            copied_size_bytes: sample.copied,
            total_size_bytes: self.total,
        });
    }
}
