//! `shuttle add` – queue a copy.

use anyhow::Result;
use shuttle_core::control::JobControl;
use shuttle_core::job_db::PriorityTier;

use crate::cli::control_socket;

pub async fn run_add(
    control: &JobControl,
    source: &str,
    destination: &str,
    priority: PriorityTier,
) -> Result<()> {
    let job = control.submit(source, destination, priority).await?;
    println!(
        "Added job {}: {} -> {} (priority {})",
        job.id, job.source_path, job.destination_path, job.priority
    );
    control_socket::try_wake(&super::socket_path()?).await;
    Ok(())
}
