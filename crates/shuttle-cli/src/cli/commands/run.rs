//! `shuttle run` – host the pipeline until Ctrl-C.

use std::sync::Arc;

use anyhow::Result;
use shuttle_core::broadcast::ProgressEvent;
use shuttle_core::config::ShuttleConfig;
use shuttle_core::job_db::{JobDb, JobStatus};
use shuttle_core::notify::format_size;
use shuttle_core::Pipeline;

use crate::cli::control_socket;

pub async fn run_pipeline(cfg: &ShuttleConfig, db: JobDb, quiet: bool) -> Result<()> {
    // Fails while another worker owns the database; the socket is only
    // (re)bound once we hold the worker lock.
    let pipeline = Pipeline::start(cfg, db).await?;

    let socket_path = super::socket_path()?;
    let listener = match control_socket::spawn_control_listener(
        pipeline.control().clone(),
        Arc::clone(pipeline.hub()),
        &socket_path,
    ) {
        Ok(guard) => {
            tracing::debug!(path = %socket_path.display(), "control socket listening");
            Some(guard)
        }
        Err(e) => {
            tracing::warn!("control socket unavailable: {:#}", e);
            eprintln!("warning: control socket unavailable, running jobs can't be cancelled remotely");
            None
        }
    };

    let printer = (!quiet).then(|| {
        let mut sub = pipeline.hub().subscribe();
        tokio::spawn(async move {
            while let Some(event) = sub.rx.recv().await {
                println!("{}", describe(&event));
            }
        })
    });

    let queued = pipeline.control().list_queue().await?.len();
    println!("Worker running ({} job(s) queued). Press Ctrl-C to stop.", queued);
    tokio::signal::ctrl_c().await?;
    println!("Stopping; a running job is given a moment to finish.");

    drop(listener);
    pipeline.shutdown().await?;
    // Connection tasks may still hold the hub, so the printer's channel never closes.
    if let Some(printer) = printer {
        printer.abort();
    }
    Ok(())
}

pub(crate) fn describe(event: &ProgressEvent) -> String {
    match event.status {
        JobStatus::Processing => format!(
            "job {}: {:>3}%  {} / {}",
            event.job_id,
            event.progress_percent,
            format_size(event.copied_size_bytes),
            format_size(event.total_size_bytes)
        ),
        status => format!("job {}: {}", event.job_id, status),
    }
}
