//! Synchronous view of the job database for the worker thread.
//!
//! The copy engine runs on a dedicated OS thread and must not touch the async
//! runtime's threads with blocking file I/O. It drives the async store through
//! the runtime handle instead. Never call these from inside an async task:
//! `Handle::block_on` panics there.

use anyhow::Result;
use tokio::runtime::Handle;

use super::db::JobDb;
use super::types::{Job, JobId};

#[derive(Clone)]
pub struct BlockingJobDb {
    db: JobDb,
    rt: Handle,
}

impl BlockingJobDb {
    pub fn new(db: JobDb, rt: Handle) -> Self {
        Self { db, rt }
    }

    pub fn runtime(&self) -> &Handle {
        &self.rt
    }

    pub fn claim_next_queued_job(&self) -> Result<Option<Job>> {
        self.rt.block_on(self.db.claim_next_queued_job())
    }

    pub fn get_job(&self, id: JobId) -> Result<Option<Job>> {
        self.rt.block_on(self.db.get_job(id))
    }

    pub fn set_total_size(&self, id: JobId, total: u64) -> Result<()> {
        self.rt.block_on(self.db.set_total_size(id, to_i64(total)))
    }

    pub fn update_progress(&self, id: JobId, copied: u64, percent: u8) -> Result<()> {
        self.rt
            .block_on(self.db.update_progress(id, to_i64(copied), i64::from(percent)))
    }

    pub fn mark_completed(&self, id: JobId) -> Result<()> {
        self.rt.block_on(self.db.mark_completed(id))
    }

    pub fn mark_failed(&self, id: JobId, message: &str) -> Result<()> {
        self.rt.block_on(self.db.mark_failed(id, message))
    }

    pub fn mark_cancelled(&self, id: JobId, message: &str) -> Result<()> {
        self.rt.block_on(self.db.mark_cancelled(id, message))
    }
}

/// SQLite integers are signed; sizes past i64::MAX saturate.
fn to_i64(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}
