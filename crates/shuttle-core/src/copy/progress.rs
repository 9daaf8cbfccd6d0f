//! Progress accumulation with throttled reporting.
//!
//! The transfer loop reports cumulative bytes per file; the tracker turns
//! those into a job-wide running total and decides when the total moved far
//! enough to be worth persisting and broadcasting.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Minimum advance between reports, regardless of job size.
pub const MIN_REPORT_STEP: u64 = 1024 * 1024;

/// Highest percentage reported before the job is marked completed.
pub const MAX_RUNNING_PERCENT: u8 = 99;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSample {
    pub copied: u64,
    pub percent: u8,
}

#[derive(Debug)]
pub struct ProgressTracker {
    total: u64,
    step: u64,
    copied: u64,
    last_reported: u64,
    per_file: HashMap<PathBuf, u64>,
}

impl ProgressTracker {
    pub fn new(total: u64) -> Self {
        Self {
            total,
            step: (total / 100).max(MIN_REPORT_STEP),
            copied: 0,
            last_reported: 0,
            per_file: HashMap::new(),
        }
    }

    /// Running total clamped to the job size.
    pub fn copied(&self) -> u64 {
        self.copied.min(self.total)
    }

    /// Record that `file` now has `file_copied` bytes written. Returns a
    /// sample when the running total advanced by at least one step since the
    /// last sample. Repeated or smaller values for a file add nothing.
    pub fn record(&mut self, file: &Path, file_copied: u64) -> Option<ProgressSample> {
        let last = self.per_file.entry(file.to_path_buf()).or_insert(0);
        if file_copied <= *last {
            return None;
        }
        self.copied = self.copied.saturating_add(file_copied - *last);
        *last = file_copied;

        if self.copied - self.last_reported < self.step {
            return None;
        }
        self.last_reported = self.copied;
        Some(ProgressSample {
            copied: self.copied(),
            percent: percent_of(self.copied, self.total),
        })
    }
}

/// Whole percent of `copied` over `total`, capped at [`MAX_RUNNING_PERCENT`].
/// An empty job reports 0.
pub fn percent_of(copied: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = u128::from(copied.min(total)) * 100 / u128::from(total);
    (pct as u8).min(MAX_RUNNING_PERCENT)
}
