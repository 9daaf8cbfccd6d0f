//! Job control: submission, cancellation, priority edits, reorder and retry.
//!
//! Queued jobs are edited directly in the job database with conditional
//! updates, so a request racing the scheduler's claim either wins cleanly or
//! sees the job as processing. Running jobs are cancelled through the shared
//! [`CancellationRegistry`], which the copy engine polls between chunks.

mod ops;
mod paths;
pub mod registry;

use std::path::PathBuf;

use thiserror::Error;

use crate::job_db::{JobId, JobStatus};

pub use ops::{CancelAllSummary, CancelOutcome, JobControl};
pub use registry::CancellationRegistry;

/// Message stored on jobs cancelled by a user request.
pub const CANCELLED_BY_USER: &str = "Cancelled by user";

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("job {0} not found")]
    NotFound(JobId),

    #[error("cannot {action} job {id}: status is {status}, expected {expected}")]
    InvalidState {
        id: JobId,
        status: JobStatus,
        action: &'static str,
        expected: &'static str,
    },

    #[error("reorder needs at least one job id")]
    EmptyReorder,

    #[error("none of the given jobs are queued")]
    NoQueuedJobs,

    #[error("invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("path {} is outside the storage root {}", .path.display(), .root.display())]
    OutsideRoot { path: PathBuf, root: PathBuf },

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Default path for the control socket (same XDG state dir as the DB).
pub fn default_control_socket_path() -> anyhow::Result<PathBuf> {
    Ok(crate::logging::state_dir()?.join("control.sock"))
}
