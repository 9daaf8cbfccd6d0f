//! Single-worker job scheduler.
//!
//! One dedicated OS thread claims queued jobs in priority order and runs each
//! through the copy engine, so at most one job is ever processing. Errors and
//! panics inside an iteration are logged and followed by a backoff; the thread
//! only ends when stopped.

mod wake;
mod worker;

pub use wake::SchedulerWaker;
pub(crate) use wake::wake_channel;
pub use worker::{run_next_job, Scheduler, SchedulerSettings};
