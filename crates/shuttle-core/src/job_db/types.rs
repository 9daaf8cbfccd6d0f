//! Types used by the job database.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Job identifier.
pub type JobId = i64;

/// Priorities assigned by `reorder` start above this value so an explicit
/// ordering always runs ahead of tier-assigned jobs.
pub const REORDER_BASE: i64 = 100;

/// Job status stored as a string in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    /// Unknown strings map to `Failed` so a corrupted row never looks runnable.
    pub fn from_db(s: &str) -> Self {
        match s {
            "queued" => JobStatus::Queued,
            "processing" => JobStatus::Processing,
            "completed" => JobStatus::Completed,
            "failed" => JobStatus::Failed,
            "cancelled" => JobStatus::Cancelled,
            _ => JobStatus::Failed,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse priority classes a user can pick; stored as small integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityTier {
    Low,
    #[default]
    Normal,
    High,
}

impl PriorityTier {
    pub fn value(self) -> i64 {
        match self {
            PriorityTier::Low => 0,
            PriorityTier::Normal => 1,
            PriorityTier::High => 2,
        }
    }
}

impl FromStr for PriorityTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" | "0" => Ok(PriorityTier::Low),
            "normal" | "1" => Ok(PriorityTier::Normal),
            "high" | "2" => Ok(PriorityTier::High),
            other => Err(format!(
                "invalid priority '{}': expected low, normal or high",
                other
            )),
        }
    }
}

/// Full job row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Job {
    pub id: JobId,
    pub source_path: String,
    pub destination_path: String,
    pub status: JobStatus,
    pub priority: i64,
    pub progress_percent: i64,
    pub total_size_bytes: i64,
    pub copied_size_bytes: i64,
    pub error_message: Option<String>,
    /// Unix seconds.
    pub created_at: i64,
    /// Unix seconds; set on every terminal transition.
    pub completed_at: Option<i64>,
}

impl Job {
    /// Seconds between submission and the terminal transition (0 while unfinished).
    pub fn duration_secs(&self) -> u64 {
        self.completed_at
            .map(|done| done.saturating_sub(self.created_at).max(0) as u64)
            .unwrap_or(0)
    }
}

pub const SECS_PER_DAY: i64 = 86_400;

/// Aggregates over the jobs created in one period.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransferStats {
    pub count: i64,
    pub completed: i64,
    pub failed: i64,
    pub cancelled: i64,
    /// Bytes moved by completed jobs.
    pub bytes: i64,
    /// Over completed jobs with a positive duration; 0 when there are none.
    pub avg_duration_secs: f64,
    /// Bytes per second, over the same jobs (size known).
    pub avg_speed_bps: f64,
    /// Completed share of all jobs in the period, 0..=100.
    pub success_rate: f64,
}

/// One UTC day of the daily breakdown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DayStats {
    /// Unix seconds of the day's UTC midnight.
    pub day_start: i64,
    pub completed: i64,
    pub failed: i64,
    pub bytes: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatsReport {
    pub today: TransferStats,
    pub week: TransferStats,
    pub month: TransferStats,
    pub all_time: TransferStats,
    /// Today first, then the six days before it.
    pub daily: Vec<DayStats>,
}
