//! CLI for the Shuttle transfer queue.

mod commands;
mod control_socket;

use std::sync::Arc;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use shuttle_core::config::{self, ShuttleConfig};
use shuttle_core::control::{CancellationRegistry, JobControl};
use shuttle_core::job_db::{JobDb, JobId, PriorityTier};

use commands::{
    run_add, run_cancel, run_cancel_all, run_completions, run_history, run_notify_test,
    run_pipeline, run_priority, run_queue, run_reorder, run_retry, run_show, run_stats,
    run_watch,
};

/// Top-level CLI for the Shuttle transfer queue.
#[derive(Debug, Parser)]
#[command(name = "shuttle")]
#[command(about = "Shuttle: prioritized, cancellable file transfer queue", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Queue a copy of a file or directory.
    Add {
        /// File or directory to copy.
        source: String,
        /// Target path. A source copied onto an existing directory lands inside it.
        destination: String,
        /// low, normal or high.
        #[arg(long, short, default_value = "normal")]
        priority: PriorityTier,
    },

    /// Show one job in detail.
    Show {
        /// Job identifier.
        id: JobId,
    },

    /// List running and queued jobs in execution order.
    Queue {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// List finished jobs, newest first.
    History {
        #[arg(long, default_value = "50")]
        limit: u32,
        #[arg(long, default_value = "0")]
        offset: u32,
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Cancel a queued or running job.
    Cancel {
        /// Job identifier.
        id: JobId,
    },

    /// Cancel every queued job and the running one.
    CancelAll,

    /// Change the priority tier of a queued job.
    Priority {
        /// Job identifier.
        id: JobId,
        /// low, normal or high.
        tier: PriorityTier,
    },

    /// Move queued jobs to the front, in the given order.
    Reorder {
        /// Job identifiers, first runs first.
        #[arg(required = true, num_args = 1..)]
        ids: Vec<JobId>,
    },

    /// Queue a fresh copy of a failed job.
    Retry {
        /// Job identifier of the failed job.
        id: JobId,
    },

    /// Run the worker: process the queue until interrupted (Ctrl-C).
    Run {
        /// Don't print progress events.
        #[arg(long, short)]
        quiet: bool,
    },

    /// Stream progress events from a running `shuttle run`.
    Watch {
        /// Print raw JSON lines.
        #[arg(long)]
        json: bool,
    },

    /// Transfer statistics: today, 7 and 30 days, all time, and per day.
    Stats {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Send a test message to the configured webhook.
    NotifyTest,

    /// Print shell completions to stdout.
    Completions {
        shell: Shell,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        // Commands that need neither config nor database.
        match cli.command {
            CliCommand::Completions { shell } => {
                run_completions(shell, &mut Cli::command());
                return Ok(());
            }
            CliCommand::Watch { json } => return run_watch(json).await,
            _ => {}
        }

        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);
        if let CliCommand::NotifyTest = cli.command {
            return run_notify_test(&cfg).await;
        }
        let db = open_db(&cfg).await?;

        match cli.command {
            CliCommand::Run { quiet } => run_pipeline(&cfg, db, quiet).await?,
            command => {
                let control = offline_control(&cfg, db);
                command.dispatch(&control).await?;
            }
        }
        Ok(())
    }

    async fn dispatch(self, control: &JobControl) -> Result<()> {
        match self {
            CliCommand::Add {
                source,
                destination,
                priority,
            } => run_add(control, &source, &destination, priority).await,
            CliCommand::Show { id } => run_show(control, id).await,
            CliCommand::Queue { json } => run_queue(control, json).await,
            CliCommand::History {
                limit,
                offset,
                json,
            } => run_history(control, limit, offset, json).await,
            CliCommand::Cancel { id } => run_cancel(control, id).await,
            CliCommand::CancelAll => run_cancel_all(control).await,
            CliCommand::Priority { id, tier } => run_priority(control, id, tier).await,
            CliCommand::Reorder { ids } => run_reorder(control, &ids).await,
            CliCommand::Retry { id } => run_retry(control, id).await,
            CliCommand::Stats { json } => run_stats(control, json).await,
            CliCommand::Run { .. }
            | CliCommand::Watch { .. }
            | CliCommand::NotifyTest
            | CliCommand::Completions { .. } => Ok(()),
        }
    }
}

async fn open_db(cfg: &ShuttleConfig) -> Result<JobDb> {
    match &cfg.db_path {
        Some(path) => JobDb::open_at(path).await,
        None => JobDb::open_default().await,
    }
}

/// Control handle for one-shot commands. Its registry is private to this
/// process, so running jobs are cancelled through the control socket instead.
fn offline_control(cfg: &ShuttleConfig, db: JobDb) -> JobControl {
    JobControl::new(db, Arc::new(CancellationRegistry::new()))
        .with_roots(cfg.source_root.clone(), cfg.destination_root.clone())
}

#[cfg(test)]
mod tests;
