//! Shuttle core: a persistent, prioritized file-transfer job pipeline.
//!
//! Jobs live in SQLite ([`job_db`]). A single worker thread ([`scheduler`])
//! claims them one at a time and runs each through the chunked copy engine
//! ([`copy`]), which reports progress to async subscribers ([`broadcast`]) and
//! calls a notifier when the job ends ([`notify`]). [`control`] edits the
//! queue and cancels jobs; [`pipeline`] wires everything together, holding
//! the [`instance`] lock so only one worker owns a database.

pub mod broadcast;
pub mod config;
pub mod control;
pub mod copy;
pub mod instance;
pub mod job_db;
pub mod logging;
pub mod notify;
pub mod pipeline;
pub mod scheduler;

pub use pipeline::Pipeline;
