//! Job read operations: get, queue and history listings.

use anyhow::Result;
use sqlx::Row;

use super::super::db::{job_from_row, JobDb, JOB_COLUMNS};
use super::super::types::{Job, JobId, JobStatus};

impl JobDb {
    /// Fetch a single job row.
    pub async fn get_job(&self, id: JobId) -> Result<Option<Job>> {
        let sql = format!("SELECT {} FROM jobs WHERE id = ?1", JOB_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(job_from_row))
    }

    /// Status of one job, or None if the id is unknown.
    pub async fn job_status(&self, id: JobId) -> Result<Option<JobStatus>> {
        let row = sqlx::query("SELECT status FROM jobs WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| {
            let s: String = r.get("status");
            JobStatus::from_db(&s)
        }))
    }

    /// Active jobs: the processing job first, then queued jobs in the order
    /// the scheduler will run them.
    pub async fn list_queue(&self) -> Result<Vec<Job>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM jobs
            WHERE status IN ('queued', 'processing')
            ORDER BY CASE status WHEN 'processing' THEN 0 ELSE 1 END,
                     priority DESC, created_at ASC, id ASC
            "#,
            JOB_COLUMNS
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(job_from_row).collect())
    }

    /// Terminal jobs, newest first.
    pub async fn list_history(&self, limit: u32, offset: u32) -> Result<Vec<Job>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM jobs
            WHERE status IN ('completed', 'failed', 'cancelled')
            ORDER BY created_at DESC, id DESC
            LIMIT ?1 OFFSET ?2
            "#,
            JOB_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(i64::from(limit))
            .bind(i64::from(offset))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(job_from_row).collect())
    }

    /// Number of rows currently in `processing` (0 or 1 while the worker owns the DB).
    pub async fn count_processing(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM jobs WHERE status = 'processing'")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }
}
