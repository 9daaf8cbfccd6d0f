//! Progress broadcast: worker-thread events fanned out to async subscribers.
//!
//! The copy engine calls [`ProgressBridge::publish`] from its OS thread. The
//! bridge forwards events over an unbounded channel to a drain task on the
//! tokio runtime, which hands each one to every [`SubscriberHub`] subscriber.
//! Delivery is best effort and at most once; there is no replay.

mod bridge;
mod hub;

use serde::{Deserialize, Serialize};

use crate::job_db::{Job, JobId, JobStatus};

pub use bridge::ProgressBridge;
pub use hub::{SubscriberHub, Subscription};

/// One progress or state change of a job, serialized as a JSON line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub job_id: JobId,
    pub status: JobStatus,
    pub progress_percent: u8,
    pub copied_size_bytes: u64,
    pub total_size_bytes: u64,
}

impl ProgressEvent {
    pub fn from_job(job: &Job) -> Self {
        Self {
            job_id: job.id,
            status: job.status,
            progress_percent: job.progress_percent.clamp(0, 100) as u8,
            copied_size_bytes: job.copied_size_bytes.max(0) as u64,
            total_size_bytes: job.total_size_bytes.max(0) as u64,
        }
    }
}

#[cfg(test)]
mod tests;
