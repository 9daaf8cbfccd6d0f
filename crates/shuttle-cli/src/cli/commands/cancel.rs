//! `shuttle cancel` and `shuttle cancel-all`.
//!
//! Queued jobs are cancelled straight in the database. A running job can only
//! be stopped by the `shuttle run` process that owns it, via the control socket.

use anyhow::{bail, Result};
use shuttle_core::control::{CancelOutcome, JobControl};
use shuttle_core::job_db::JobId;

use crate::cli::control_socket::{self, ControlRequest};

pub async fn run_cancel(control: &JobControl, id: JobId) -> Result<()> {
    match control.cancel(id).await? {
        CancelOutcome::Cancelled => println!("Cancelled job {}.", id),
        CancelOutcome::AlreadyFinished(status) => {
            println!("Job {} already finished ({}); nothing to cancel.", id, status)
        }
        CancelOutcome::Requested => {
            let reply = forward(ControlRequest::Cancel(id)).await?;
            println!("Job {} is running; worker replied: {}", id, reply);
        }
    }
    Ok(())
}

pub async fn run_cancel_all(control: &JobControl) -> Result<()> {
    let path = super::socket_path()?;
    if path.exists() {
        if let Ok(reply) = control_socket::send_request(&path, ControlRequest::CancelAll).await {
            println!("Worker replied: {}", reply);
            return Ok(());
        }
    }
    let summary = control.cancel_all().await?;
    println!("Cancelled {} queued job(s).", summary.cancelled);
    if !summary.requested.is_empty() {
        tracing::warn!(
            "jobs {:?} are marked processing but no worker is reachable",
            summary.requested
        );
        println!(
            "{} job(s) marked running but no worker is reachable.",
            summary.requested.len()
        );
    }
    Ok(())
}

async fn forward(request: ControlRequest) -> Result<String> {
    let path = super::socket_path()?;
    if !path.exists() {
        bail!("no running worker (control socket {} missing)", path.display());
    }
    let reply = control_socket::send_request(&path, request).await?;
    if let Some(err) = reply.strip_prefix("error ") {
        bail!("worker: {}", err);
    }
    Ok(reply)
}
