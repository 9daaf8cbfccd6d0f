//! `shuttle queue` and `shuttle history`.

use anyhow::Result;
use shuttle_core::control::JobControl;
use shuttle_core::job_db::Job;

pub async fn run_queue(control: &JobControl, json: bool) -> Result<()> {
    let jobs = control.list_queue().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&jobs)?);
    } else if jobs.is_empty() {
        println!("Queue is empty.");
    } else {
        print_table(&jobs);
    }
    Ok(())
}

pub async fn run_history(control: &JobControl, limit: u32, offset: u32, json: bool) -> Result<()> {
    let jobs = control.list_history(limit, offset).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&jobs)?);
    } else if jobs.is_empty() {
        println!("No finished jobs.");
    } else {
        print_table(&jobs);
    }
    Ok(())
}

fn print_table(jobs: &[Job]) {
    println!(
        "{:<6} {:<11} {:<5} {:>5} {:<24} {}",
        "ID", "STATUS", "PRIO", "PCT", "SIZE", "SOURCE -> DESTINATION"
    );
    for j in jobs {
        println!(
            "{:<6} {:<11} {:<5} {:>4}% {:<24} {} -> {}",
            j.id,
            j.status,
            j.priority,
            j.progress_percent,
            super::size_summary(j),
            j.source_path,
            j.destination_path
        );
    }
}
