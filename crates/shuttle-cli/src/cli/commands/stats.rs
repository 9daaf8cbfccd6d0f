//! `shuttle stats` – transfer statistics per period and per day.

use std::time::Duration;

use anyhow::Result;
use shuttle_core::control::JobControl;
use shuttle_core::job_db::{StatsReport, TransferStats};
use shuttle_core::notify::{format_duration, format_size};

pub async fn run_stats(control: &JobControl, json: bool) -> Result<()> {
    let report = control.stats().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render(&report));
    }
    Ok(())
}

pub(crate) fn render(report: &StatsReport) -> String {
    let mut out = format!(
        "{:<10} {:>5} {:>5} {:>6} {:>9} {:>11} {:>9} {:>12} {:>8}\n",
        "PERIOD", "JOBS", "DONE", "FAILED", "CANCELLED", "BYTES", "AVG TIME", "AVG SPEED", "SUCCESS"
    );
    for (name, s) in [
        ("today", &report.today),
        ("7 days", &report.week),
        ("30 days", &report.month),
        ("all time", &report.all_time),
    ] {
        out.push_str(&period_row(name, s));
    }

    out.push_str("\nLast 7 days:\n");
    for (back, day) in report.daily.iter().enumerate() {
        let label = match back {
            0 => "today".to_string(),
            1 => "yesterday".to_string(),
            n => format!("{} days ago", n),
        };
        out.push_str(&format!(
            "  {:<11} {:>3} done {:>3} failed {:>11}\n",
            label,
            day.completed,
            day.failed,
            format_size(day.bytes.max(0) as u64)
        ));
    }
    out
}

fn period_row(name: &str, s: &TransferStats) -> String {
    let speed = if s.avg_speed_bps > 0.0 {
        format!("{}/s", format_size(s.avg_speed_bps as u64))
    } else {
        "N/A".to_string()
    };
    format!(
        "{:<10} {:>5} {:>5} {:>6} {:>9} {:>11} {:>9} {:>12} {:>7.1}%\n",
        name,
        s.count,
        s.completed,
        s.failed,
        s.cancelled,
        format_size(s.bytes.max(0) as u64),
        format_duration(Duration::from_secs_f64(s.avg_duration_secs.max(0.0))),
        speed,
        s.success_rate
    )
}
