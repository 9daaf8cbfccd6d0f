//! Terminal-job notifications.
//!
//! The engine calls [`TerminalNotifier::notify`] once per job after its final
//! state is stored. Implementations must return quickly; anything slow (HTTP)
//! is pushed onto the runtime's blocking pool.

mod format;
mod webhook;

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;

use crate::config::NotifyConfig;
use crate::job_db::{Job, JobId, JobStatus};

pub use format::{format_duration, format_size};
pub use webhook::WebhookNotifier;

/// What a notifier learns about a finished job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutcome {
    pub job_id: JobId,
    pub source_path: String,
    pub destination_path: String,
    pub status: JobStatus,
    pub total_size_bytes: u64,
    pub duration: Duration,
    pub error_message: Option<String>,
}

impl JobOutcome {
    pub fn from_job(job: &Job) -> Self {
        Self {
            job_id: job.id,
            source_path: job.source_path.clone(),
            destination_path: job.destination_path.clone(),
            status: job.status,
            total_size_bytes: job.total_size_bytes.max(0) as u64,
            duration: Duration::from_secs(job.duration_secs()),
            error_message: job.error_message.clone(),
        }
    }
}

/// Fire-and-forget hook for terminal transitions. Must not block or panic.
pub trait TerminalNotifier: Send + Sync {
    fn notify(&self, outcome: JobOutcome);
}

/// Writes one log line per finished job.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl TerminalNotifier for LogNotifier {
    fn notify(&self, outcome: JobOutcome) {
        let size = format_size(outcome.total_size_bytes);
        let took = format_duration(outcome.duration);
        match outcome.status {
            JobStatus::Completed => tracing::info!(
                job_id = outcome.job_id,
                "copy completed: {} -> {} ({} in {})",
                outcome.source_path,
                outcome.destination_path,
                size,
                took
            ),
            status => tracing::warn!(
                job_id = outcome.job_id,
                "copy {}: {} -> {}: {}",
                status,
                outcome.source_path,
                outcome.destination_path,
                outcome.error_message.as_deref().unwrap_or("no details")
            ),
        }
    }
}

/// Log notifier always; webhook on top when one is configured.
pub fn from_config(cfg: &NotifyConfig, rt: Handle) -> Arc<dyn TerminalNotifier> {
    match WebhookNotifier::from_config(cfg, rt) {
        Some(webhook) => Arc::new(Fanout(vec![Box::new(LogNotifier), Box::new(webhook)])),
        None => Arc::new(LogNotifier),
    }
}

struct Fanout(Vec<Box<dyn TerminalNotifier>>);

impl TerminalNotifier for Fanout {
    fn notify(&self, outcome: JobOutcome) {
        for n in &self.0 {
            n.notify(outcome.clone());
        }
    }
}
