//! Temp-dir fixtures: source files and trees, pipeline config, polling.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use shuttle_core::broadcast::{ProgressEvent, Subscription};
use shuttle_core::config::ShuttleConfig;
use shuttle_core::job_db::{Job, JobDb, JobId, JobStatus};
use tempfile::TempDir;

pub struct Workspace {
    pub dir: TempDir,
    pub db: JobDb,
}

impl Workspace {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db = JobDb::open_at(dir.path().join("state/jobs.db")).await.unwrap();
        Self { dir, db }
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    /// Write a file of `len` bytes with a position-dependent pattern.
    pub fn file(&self, rel: &str, len: usize) -> PathBuf {
        let p = self.path(rel);
        if let Some(parent) = p.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&p, pattern(len)).unwrap();
        p
    }

    pub async fn job(&self, id: JobId) -> Job {
        self.db.get_job(id).await.unwrap().expect("job exists")
    }

    pub async fn wait_for(&self, id: JobId, want: JobStatus) -> Job {
        for _ in 0..500 {
            let job = self.job(id).await;
            if job.status == want {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("job {} never reached {}", id, want);
    }
}

pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// Fast polling; tiny chunks make transfers slow enough to cancel mid-way.
pub fn config(chunk_size: usize) -> ShuttleConfig {
    ShuttleConfig {
        poll_interval_secs: 1,
        fault_backoff_secs: 1,
        chunk_size_bytes: chunk_size,
        ..ShuttleConfig::default()
    }
}

pub fn path_str(p: &Path) -> &str {
    p.to_str().unwrap()
}

pub async fn next_event(sub: &mut Subscription) -> ProgressEvent {
    tokio::time::timeout(Duration::from_secs(10), sub.rx.recv())
        .await
        .expect("event within timeout")
        .expect("hub still open")
}

/// Receive events until one for `job_id` has `status`.
pub async fn events_until(
    sub: &mut Subscription,
    job_id: JobId,
    status: JobStatus,
) -> Vec<ProgressEvent> {
    let mut seen = Vec::new();
    loop {
        let ev = next_event(sub).await;
        let done = ev.job_id == job_id && ev.status == status;
        seen.push(ev);
        if done {
            return seen;
        }
    }
}
