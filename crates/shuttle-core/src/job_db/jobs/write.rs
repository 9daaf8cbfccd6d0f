//! Job write operations: add, claim, progress, terminal transitions, queue edits.

use anyhow::Result;

use super::super::db::{job_from_row, unix_timestamp, JobDb, JOB_COLUMNS};
use super::super::types::{Job, JobId, JobStatus, REORDER_BASE};

impl JobDb {
    /// Insert a new queued job.
    pub async fn add_job(
        &self,
        source_path: &str,
        destination_path: &str,
        priority: i64,
    ) -> Result<JobId> {
        let now = unix_timestamp();
        let row_id = sqlx::query(
            r#"
            INSERT INTO jobs (
                source_path, destination_path, status, priority,
                progress_percent, total_size_bytes, copied_size_bytes,
                error_message, created_at, completed_at
            ) VALUES (?1, ?2, 'queued', ?3, 0, 0, 0, NULL, ?4, NULL)
            "#,
        )
        .bind(source_path)
        .bind(destination_path)
        .bind(priority)
        .bind(now)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        Ok(row_id)
    }

    /// Atomically claim the next queued job (highest priority, then oldest) by
    /// setting its status to `processing`. Returns the claimed row, or None if
    /// nothing is queued. The conditional update loses cleanly against a
    /// concurrent cancel of the same row.
    pub async fn claim_next_queued_job(&self) -> Result<Option<Job>> {
        let mut tx = self.pool.begin().await?;
        let sql = format!(
            r#"
            SELECT {}
            FROM jobs
            WHERE status = 'queued'
            ORDER BY priority DESC, created_at ASC, id ASC
            LIMIT 1
            "#,
            JOB_COLUMNS
        );
        let row = sqlx::query(&sql).fetch_optional(&mut *tx).await?;
        let Some(row) = row else {
            tx.commit().await?;
            return Ok(None);
        };
        let mut job = job_from_row(&row);
        let claimed = sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'processing',
                progress_percent = 0,
                copied_size_bytes = 0,
                error_message = NULL
            WHERE id = ?1 AND status = 'queued'
            "#,
        )
        .bind(job.id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        tx.commit().await?;

        if claimed == 0 {
            return Ok(None);
        }
        job.status = JobStatus::Processing;
        job.progress_percent = 0;
        job.copied_size_bytes = 0;
        job.error_message = None;
        Ok(Some(job))
    }

    /// Record the computed source size. Called once per run before the transfer starts.
    pub async fn set_total_size(&self, id: JobId, total_size_bytes: i64) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE jobs
            SET total_size_bytes = ?1
            WHERE id = ?2
            "#,
        )
        .bind(total_size_bytes)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Persist a progress sample. Values only move forward, copied bytes never
    /// pass the total, and the percentage stays below 100 until completion.
    pub async fn update_progress(
        &self,
        id: JobId,
        copied_size_bytes: i64,
        progress_percent: i64,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE jobs
            SET copied_size_bytes = MIN(MAX(copied_size_bytes, ?1), total_size_bytes),
                progress_percent = MIN(MAX(progress_percent, ?2), 99)
            WHERE id = ?3 AND status = 'processing'
            "#,
        )
        .bind(copied_size_bytes)
        .bind(progress_percent)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Success: 100%, copied = total, completed_at = now, in one statement.
    pub async fn mark_completed(&self, id: JobId) -> Result<()> {
        let now = unix_timestamp();
        sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'completed',
                progress_percent = 100,
                copied_size_bytes = total_size_bytes,
                error_message = NULL,
                completed_at = ?1
            WHERE id = ?2
            "#,
        )
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn mark_failed(&self, id: JobId, message: &str) -> Result<()> {
        self.finish_with_message(id, JobStatus::Failed, message).await
    }

    pub async fn mark_cancelled(&self, id: JobId, message: &str) -> Result<()> {
        self.finish_with_message(id, JobStatus::Cancelled, message).await
    }

    async fn finish_with_message(&self, id: JobId, status: JobStatus, message: &str) -> Result<()> {
        let now = unix_timestamp();
        sqlx::query(
            r#"
            UPDATE jobs
            SET status = ?1,
                error_message = ?2,
                completed_at = ?3
            WHERE id = ?4
            "#,
        )
        .bind(status.as_str())
        .bind(message)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Cancel a job only if it is still queued. Returns true if the row changed.
    pub async fn cancel_if_queued(&self, id: JobId, message: &str) -> Result<bool> {
        let now = unix_timestamp();
        let r = sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'cancelled',
                error_message = ?1,
                completed_at = ?2
            WHERE id = ?3 AND status = 'queued'
            "#,
        )
        .bind(message)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(r.rows_affected() == 1)
    }

    /// Cancel every queued job. Returns the number of jobs cancelled.
    pub async fn cancel_all_queued(&self, message: &str) -> Result<u64> {
        let now = unix_timestamp();
        let r = sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'cancelled',
                error_message = ?1,
                completed_at = ?2
            WHERE status = 'queued'
            "#,
        )
        .bind(message)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(r.rows_affected())
    }

    /// Change priority of a queued job. Returns false if the job is not queued (or unknown).
    pub async fn set_priority_if_queued(&self, id: JobId, priority: i64) -> Result<bool> {
        let r = sqlx::query(
            r#"
            UPDATE jobs
            SET priority = ?1
            WHERE id = ?2 AND status = 'queued'
            "#,
        )
        .bind(priority)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(r.rows_affected() == 1)
    }

    /// Give each still-queued id a priority above every tier, strictly
    /// decreasing by list position. Ids that are unknown or no longer queued
    /// are skipped. Returns the number of jobs reprioritized.
    pub async fn reorder_queued(&self, ids: &[JobId]) -> Result<u64> {
        let total = ids.len() as i64;
        let mut tx = self.pool.begin().await?;
        let mut changed = 0u64;
        for (index, id) in ids.iter().enumerate() {
            let priority = REORDER_BASE + (total - index as i64);
            changed += sqlx::query(
                r#"
                UPDATE jobs
                SET priority = ?1
                WHERE id = ?2 AND status = 'queued'
                "#,
            )
            .bind(priority)
            .bind(*id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }
        tx.commit().await?;
        Ok(changed)
    }

    /// Clone a failed job into a fresh queued row with the same paths.
    /// Returns the new id, or None if the source row is not failed (or unknown).
    /// The original row is never modified.
    pub async fn retry_failed(&self, id: JobId, priority: i64) -> Result<Option<JobId>> {
        let now = unix_timestamp();
        let r = sqlx::query(
            r#"
            INSERT INTO jobs (
                source_path, destination_path, status, priority,
                progress_percent, total_size_bytes, copied_size_bytes,
                error_message, created_at, completed_at
            )
            SELECT source_path, destination_path, 'queued', ?1, 0, 0, 0, NULL, ?2, NULL
            FROM jobs
            WHERE id = ?3 AND status = 'failed'
            "#,
        )
        .bind(priority)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        if r.rows_affected() == 0 {
            return Ok(None);
        }
        Ok(Some(r.last_insert_rowid()))
    }

    /// Fail any job left in `processing` by a previous process (transfers are
    /// not resumable). Call before the scheduler starts. Returns the number of jobs reset.
    pub async fn fail_stranded_jobs(&self, message: &str) -> Result<u64> {
        let now = unix_timestamp();
        let r = sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'failed',
                error_message = ?1,
                completed_at = ?2
            WHERE status = 'processing'
            "#,
        )
        .bind(message)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(r.rows_affected())
    }
}
