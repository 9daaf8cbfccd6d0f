//! Aggregate queries for transfer statistics.

use anyhow::Result;
use sqlx::Row;

use super::super::db::JobDb;
use super::super::types::{DayStats, StatsReport, TransferStats, SECS_PER_DAY};

impl JobDb {
    /// Aggregates over jobs with `from <= created_at < until`.
    pub async fn transfer_stats(&self, from: i64, until: i64) -> Result<TransferStats> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS count,
                   COALESCE(SUM(status = 'completed'), 0) AS completed,
                   COALESCE(SUM(status = 'failed'), 0) AS failed,
                   COALESCE(SUM(status = 'cancelled'), 0) AS cancelled,
                   COALESCE(SUM(CASE WHEN status = 'completed'
                                     THEN total_size_bytes ELSE 0 END), 0) AS bytes,
                   AVG(CASE WHEN status = 'completed' AND completed_at > created_at
                            THEN CAST(completed_at - created_at AS REAL) END) AS avg_duration,
                   AVG(CASE WHEN status = 'completed' AND completed_at > created_at
                                 AND total_size_bytes > 0
                            THEN CAST(total_size_bytes AS REAL) / (completed_at - created_at)
                       END) AS avg_speed
            FROM jobs
            WHERE created_at >= ?1 AND created_at < ?2
            "#,
        )
        .bind(from)
        .bind(until)
        .fetch_one(&self.pool)
        .await?;

        let count: i64 = row.get("count");
        let completed: i64 = row.get("completed");
        let avg_duration: Option<f64> = row.get("avg_duration");
        let avg_speed: Option<f64> = row.get("avg_speed");
        let success_rate = if count > 0 {
            completed as f64 * 100.0 / count as f64
        } else {
            0.0
        };
        Ok(TransferStats {
            count,
            completed,
            failed: row.get("failed"),
            cancelled: row.get("cancelled"),
            bytes: row.get("bytes"),
            avg_duration_secs: avg_duration.unwrap_or(0.0),
            avg_speed_bps: avg_speed.unwrap_or(0.0),
            success_rate,
        })
    }

    /// Today, last 7 and 30 days, all time, plus a per-day breakdown of the
    /// last week. Periods start at UTC midnight.
    pub async fn stats_report(&self, now: i64) -> Result<StatsReport> {
        let today = now - now.rem_euclid(SECS_PER_DAY);

        let mut daily = Vec::with_capacity(7);
        for back in 0..7 {
            let start = today - back * SECS_PER_DAY;
            let day = self.transfer_stats(start, start + SECS_PER_DAY).await?;
            daily.push(DayStats {
                day_start: start,
                completed: day.completed,
                failed: day.failed,
                bytes: day.bytes,
            });
        }

        Ok(StatsReport {
            today: self.transfer_stats(today, i64::MAX).await?,
            week: self.transfer_stats(today - 7 * SECS_PER_DAY, i64::MAX).await?,
            month: self.transfer_stats(today - 30 * SECS_PER_DAY, i64::MAX).await?,
            all_time: self.transfer_stats(i64::MIN, i64::MAX).await?,
            daily,
        })
    }
}
