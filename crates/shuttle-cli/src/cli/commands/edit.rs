//! Queue edits: `shuttle priority`, `shuttle reorder`, `shuttle retry`.

use anyhow::Result;
use shuttle_core::control::JobControl;
use shuttle_core::job_db::{JobId, PriorityTier};

use crate::cli::control_socket;

pub async fn run_priority(control: &JobControl, id: JobId, tier: PriorityTier) -> Result<()> {
    let job = control.set_priority(id, tier).await?;
    println!("Job {} priority set to {}.", job.id, job.priority);
    control_socket::try_wake(&super::socket_path()?).await;
    Ok(())
}

pub async fn run_reorder(control: &JobControl, ids: &[JobId]) -> Result<()> {
    let changed = control.reorder(ids).await?;
    println!("Reordered {} queued job(s).", changed);
    control_socket::try_wake(&super::socket_path()?).await;
    Ok(())
}

pub async fn run_retry(control: &JobControl, id: JobId) -> Result<()> {
    let job = control.retry(id).await?;
    println!("Job {} requeued as job {}.", id, job.id);
    control_socket::try_wake(&super::socket_path()?).await;
    Ok(())
}
