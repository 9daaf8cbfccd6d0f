//! CLI command handlers, one file per command.

mod add;
mod cancel;
mod completions;
mod edit;
mod list;
mod notify;
mod run;
mod show;
mod stats;
mod watch;

pub use add::run_add;
pub use cancel::{run_cancel, run_cancel_all};
pub use completions::run_completions;
pub use edit::{run_priority, run_reorder, run_retry};
pub use list::{run_history, run_queue};
pub use notify::run_notify_test;
pub use run::run_pipeline;
pub use show::run_show;
pub use stats::run_stats;
pub use watch::run_watch;

use std::path::PathBuf;

use anyhow::Result;
use shuttle_core::job_db::Job;
use shuttle_core::notify::format_size;

fn socket_path() -> Result<PathBuf> {
    shuttle_core::control::default_control_socket_path()
}

/// "1.50 MB / 3.00 MB" or "-" when the size isn't known yet.
fn size_summary(job: &Job) -> String {
    if job.total_size_bytes <= 0 {
        return "-".to_string();
    }
    format!(
        "{} / {}",
        format_size(job.copied_size_bytes.max(0) as u64),
        format_size(job.total_size_bytes as u64)
    )
}
