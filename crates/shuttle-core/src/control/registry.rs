//! Cancellation registry: job ids whose running transfer should stop.
//!
//! Request handlers add ids; the worker thread checks membership before each
//! chunk and removes the id once the job reaches a terminal state.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::job_db::JobId;

#[derive(Debug, Default)]
pub struct CancellationRegistry {
    ids: Mutex<HashSet<JobId>>,
}

impl CancellationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock can't leave a HashSet half-updated, so
    // a poisoned lock is still usable.
    fn ids(&self) -> MutexGuard<'_, HashSet<JobId>> {
        self.ids.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mark a job for cancellation. Returns false if it was already marked.
    pub fn request(&self, job_id: JobId) -> bool {
        self.ids().insert(job_id)
    }

    pub fn is_requested(&self, job_id: JobId) -> bool {
        self.ids().contains(&job_id)
    }

    /// Forget a job (call once the cancellation was acted upon or the job finished).
    pub fn clear(&self, job_id: JobId) -> bool {
        self.ids().remove(&job_id)
    }

    pub fn len(&self) -> usize {
        self.ids().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids().is_empty()
    }
}
