//! SQLite-backed job database implementation.
//!
//! Handles connection, migrations, and timestamp helpers. Job CRUD lives in `jobs`.

use anyhow::{Context, Result};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Pool, Row, Sqlite};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::types::{Job, JobStatus};

/// Handle to the SQLite-backed job database.
///
/// The database file is stored under the XDG state directory:
/// `~/.local/state/shuttle/jobs.db` on Debian. WAL journaling lets request
/// handlers read while the worker thread commits progress.
#[derive(Clone)]
pub struct JobDb {
    pub(crate) pool: Pool<Sqlite>,
    path: Option<PathBuf>,
}

impl JobDb {
    /// Open (or create) the default job database and run migrations.
    pub async fn open_default() -> Result<Self> {
        let state_dir = crate::logging::state_dir()?;
        Self::open_at(state_dir.join("jobs.db")).await
    }

    /// Open (or create) the database at a specific path. Creates parent dirs if needed.
    pub async fn open_at(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await
            .with_context(|| format!("open job database {}", path.display()))?;

        let db = JobDb {
            pool,
            path: Some(path.to_path_buf()),
        };
        db.migrate().await?;
        Ok(db)
    }

    /// Database file, or None for an in-memory store.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    async fn migrate(&self) -> Result<()> {
        // Sizes and progress are NOT NULL with 0 defaults so readers never see
        // a half-initialized row.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS jobs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                source_path TEXT NOT NULL,
                destination_path TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'queued',
                priority INTEGER NOT NULL DEFAULT 1,
                progress_percent INTEGER NOT NULL DEFAULT 0,
                total_size_bytes INTEGER NOT NULL DEFAULT 0,
                copied_size_bytes INTEGER NOT NULL DEFAULT 0,
                error_message TEXT,
                created_at INTEGER NOT NULL,
                completed_at INTEGER
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_jobs_status_priority
            ON jobs (status, priority DESC, created_at ASC);
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Column list shared by every query that materializes a `Job`.
pub(crate) const JOB_COLUMNS: &str = "id, source_path, destination_path, status, priority, \
     progress_percent, total_size_bytes, copied_size_bytes, error_message, \
     created_at, completed_at";

pub(crate) fn job_from_row(row: &SqliteRow) -> Job {
    let status: String = row.get("status");
    Job {
        id: row.get("id"),
        source_path: row.get("source_path"),
        destination_path: row.get("destination_path"),
        status: JobStatus::from_db(&status),
        priority: row.get("priority"),
        progress_percent: row.get("progress_percent"),
        total_size_bytes: row.get("total_size_bytes"),
        copied_size_bytes: row.get("copied_size_bytes"),
        error_message: row.get("error_message"),
        created_at: row.get("created_at"),
        completed_at: row.get("completed_at"),
    }
}

/// Current time as Unix seconds (for DB timestamps).
pub(crate) fn unix_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

#[cfg(test)]
/// Open an in-memory database for tests (no disk I/O). Single connection so the
/// pool never hands back a different, empty database.
pub(crate) async fn open_memory() -> Result<JobDb> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;
    let db = JobDb { pool, path: None };
    db.migrate().await?;
    Ok(db)
}
