//! Persistent job database (SQLite via sqlx).
//!
//! Stores one row per transfer job: paths, status, priority, progress and
//! timestamps. It is the pipeline's only source of truth; events pushed to
//! subscribers are a side channel.

pub mod blocking;
pub mod db;
mod jobs;
pub mod types;

pub use blocking::BlockingJobDb;
pub use db::*;
pub use types::*;

#[cfg(test)]
mod tests;
