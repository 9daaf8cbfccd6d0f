//! `shuttle show` – one job in detail.

use anyhow::Result;
use shuttle_core::control::JobControl;
use shuttle_core::job_db::JobId;
use shuttle_core::notify::format_duration;
use std::time::Duration;

pub async fn run_show(control: &JobControl, id: JobId) -> Result<()> {
    let job = control.get(id).await?;
    println!("Job {}", job.id);
    println!("  status:      {}", job.status);
    println!("  priority:    {}", job.priority);
    println!("  source:      {}", job.source_path);
    println!("  destination: {}", job.destination_path);
    println!("  progress:    {}%  ({})", job.progress_percent, super::size_summary(&job));
    if job.completed_at.is_some() {
        println!(
            "  duration:    {}",
            format_duration(Duration::from_secs(job.duration_secs()))
        );
    }
    if let Some(err) = &job.error_message {
        println!("  message:     {}", err);
    }
    Ok(())
}
