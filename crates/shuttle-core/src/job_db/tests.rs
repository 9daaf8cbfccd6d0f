//! Tests for job_db (use in-memory DB helper from db).

use crate::job_db::db::open_memory;
use crate::job_db::{JobStatus, PriorityTier, REORDER_BASE};

#[tokio::test]
async fn add_and_get_job() {
    let db = open_memory().await.unwrap();
    let id = db.add_job("/src/a.mkv", "/dst/a.mkv", 1).await.unwrap();

    let job = db.get_job(id).await.unwrap().expect("job exists");
    assert_eq!(job.id, id);
    assert_eq!(job.source_path, "/src/a.mkv");
    assert_eq!(job.destination_path, "/dst/a.mkv");
    assert_eq!(job.status, JobStatus::Queued);
    assert_eq!(job.priority, 1);
    assert_eq!(job.progress_percent, 0);
    assert_eq!(job.total_size_bytes, 0);
    assert_eq!(job.copied_size_bytes, 0);
    assert!(job.error_message.is_none());
    assert!(job.completed_at.is_none());

    assert!(db.get_job(id + 100).await.unwrap().is_none());
    assert_eq!(db.job_status(id).await.unwrap(), Some(JobStatus::Queued));
}

#[tokio::test]
async fn claim_orders_by_priority_then_submission() {
    let db = open_memory().await.unwrap();
    let a = db.add_job("/a", "/da", 1).await.unwrap();
    let b = db.add_job("/b", "/db", 2).await.unwrap();
    let c = db.add_job("/c", "/dc", 1).await.unwrap();

    let mut order = Vec::new();
    while let Some(job) = db.claim_next_queued_job().await.unwrap() {
        assert_eq!(job.status, JobStatus::Processing);
        order.push(job.id);
        db.mark_completed(job.id).await.unwrap();
    }
    assert_eq!(order, vec![b, a, c]);
}

#[tokio::test]
async fn claim_sets_processing_and_skips_cancelled() {
    let db = open_memory().await.unwrap();
    let a = db.add_job("/a", "/da", 1).await.unwrap();
    let b = db.add_job("/b", "/db", 1).await.unwrap();

    assert!(db.cancel_if_queued(a, "Cancelled by user").await.unwrap());
    let job = db.claim_next_queued_job().await.unwrap().expect("b queued");
    assert_eq!(job.id, b);
    assert_eq!(db.count_processing().await.unwrap(), 1);
    assert!(db.claim_next_queued_job().await.unwrap().is_none());

    let cancelled = db.get_job(a).await.unwrap().unwrap();
    assert_eq!(cancelled.status, JobStatus::Cancelled);
    assert_eq!(cancelled.error_message.as_deref(), Some("Cancelled by user"));
    assert!(cancelled.completed_at.is_some());
}

#[tokio::test]
async fn progress_is_monotonic_and_capped() {
    let db = open_memory().await.unwrap();
    let id = db.add_job("/a", "/da", 1).await.unwrap();
    db.claim_next_queued_job().await.unwrap();
    db.set_total_size(id, 1000).await.unwrap();

    db.update_progress(id, 400, 40).await.unwrap();
    db.update_progress(id, 300, 30).await.unwrap();
    let job = db.get_job(id).await.unwrap().unwrap();
    assert_eq!(job.copied_size_bytes, 400);
    assert_eq!(job.progress_percent, 40);

    db.update_progress(id, 5000, 100).await.unwrap();
    let job = db.get_job(id).await.unwrap().unwrap();
    assert_eq!(job.copied_size_bytes, 1000);
    assert_eq!(job.progress_percent, 99);

    db.mark_completed(id).await.unwrap();
    let job = db.get_job(id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.progress_percent, 100);
    assert_eq!(job.copied_size_bytes, job.total_size_bytes);
}

#[tokio::test]
async fn progress_ignored_once_terminal() {
    let db = open_memory().await.unwrap();
    let id = db.add_job("/a", "/da", 1).await.unwrap();
    db.claim_next_queued_job().await.unwrap();
    db.set_total_size(id, 100).await.unwrap();
    db.mark_failed(id, "disk full").await.unwrap();

    db.update_progress(id, 50, 50).await.unwrap();
    let job = db.get_job(id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.copied_size_bytes, 0);
    assert_eq!(job.error_message.as_deref(), Some("disk full"));
}

#[tokio::test]
async fn cancel_if_queued_leaves_processing_rows_alone() {
    let db = open_memory().await.unwrap();
    let id = db.add_job("/a", "/da", 1).await.unwrap();
    db.claim_next_queued_job().await.unwrap();
    assert!(!db.cancel_if_queued(id, "Cancelled by user").await.unwrap());
    assert_eq!(db.job_status(id).await.unwrap(), Some(JobStatus::Processing));
}

#[tokio::test]
async fn set_priority_only_while_queued() {
    let db = open_memory().await.unwrap();
    let a = db.add_job("/a", "/da", 1).await.unwrap();
    let b = db.add_job("/b", "/db", 1).await.unwrap();

    assert!(db
        .set_priority_if_queued(b, PriorityTier::High.value())
        .await
        .unwrap());
    let claimed = db.claim_next_queued_job().await.unwrap().unwrap();
    assert_eq!(claimed.id, b);

    assert!(!db
        .set_priority_if_queued(b, PriorityTier::Low.value())
        .await
        .unwrap());
    assert_eq!(db.get_job(b).await.unwrap().unwrap().priority, 2);
    assert_eq!(db.get_job(a).await.unwrap().unwrap().priority, 1);
}

#[tokio::test]
async fn reorder_assigns_descending_priorities_above_tiers() {
    let db = open_memory().await.unwrap();
    let a = db.add_job("/a", "/da", 2).await.unwrap();
    let b = db.add_job("/b", "/db", 1).await.unwrap();
    let c = db.add_job("/c", "/dc", 0).await.unwrap();
    let outsider = db.add_job("/x", "/dx", 2).await.unwrap();

    let changed = db.reorder_queued(&[c, a, b, 9999]).await.unwrap();
    assert_eq!(changed, 3);
    assert_eq!(db.get_job(c).await.unwrap().unwrap().priority, REORDER_BASE + 4);
    assert_eq!(db.get_job(a).await.unwrap().unwrap().priority, REORDER_BASE + 3);
    assert_eq!(db.get_job(b).await.unwrap().unwrap().priority, REORDER_BASE + 2);
    assert_eq!(db.get_job(outsider).await.unwrap().unwrap().priority, 2);

    let mut order = Vec::new();
    while let Some(job) = db.claim_next_queued_job().await.unwrap() {
        order.push(job.id);
        db.mark_completed(job.id).await.unwrap();
    }
    assert_eq!(order, vec![c, a, b, outsider]);
}

#[tokio::test]
async fn retry_clones_failed_job_only() {
    let db = open_memory().await.unwrap();
    let id = db.add_job("/src/show", "/dst/show", 2).await.unwrap();
    assert!(db.retry_failed(id, 1).await.unwrap().is_none());

    db.claim_next_queued_job().await.unwrap();
    db.mark_failed(id, "Source path does not exist: /src/show")
        .await
        .unwrap();

    let new_id = db.retry_failed(id, 1).await.unwrap().expect("retried");
    assert_ne!(new_id, id);
    let clone = db.get_job(new_id).await.unwrap().unwrap();
    assert_eq!(clone.status, JobStatus::Queued);
    assert_eq!(clone.source_path, "/src/show");
    assert_eq!(clone.destination_path, "/dst/show");
    assert!(clone.error_message.is_none());

    let original = db.get_job(id).await.unwrap().unwrap();
    assert_eq!(original.status, JobStatus::Failed);
    assert!(original.error_message.is_some());
}

#[tokio::test]
async fn queue_and_history_listings() {
    let db = open_memory().await.unwrap();
    let a = db.add_job("/a", "/da", 1).await.unwrap();
    let b = db.add_job("/b", "/db", 2).await.unwrap();
    let c = db.add_job("/c", "/dc", 1).await.unwrap();
    let d = db.add_job("/d", "/dd", 1).await.unwrap();

    // b runs first and completes; a is claimed and left processing.
    let first = db.claim_next_queued_job().await.unwrap().unwrap();
    assert_eq!(first.id, b);
    db.mark_completed(b).await.unwrap();
    db.claim_next_queued_job().await.unwrap();
    db.cancel_if_queued(d, "Cancelled by user").await.unwrap();

    let queue: Vec<_> = db.list_queue().await.unwrap().iter().map(|j| j.id).collect();
    assert_eq!(queue, vec![a, c]);

    let history: Vec<_> = db
        .list_history(50, 0)
        .await
        .unwrap()
        .iter()
        .map(|j| j.id)
        .collect();
    assert_eq!(history, vec![d, b]);

    let page: Vec<_> = db
        .list_history(1, 1)
        .await
        .unwrap()
        .iter()
        .map(|j| j.id)
        .collect();
    assert_eq!(page, vec![b]);
}

#[tokio::test]
async fn stranded_processing_jobs_fail_on_recovery() {
    let db = open_memory().await.unwrap();
    let id = db.add_job("/a", "/da", 1).await.unwrap();
    db.claim_next_queued_job().await.unwrap();

    let n = db.fail_stranded_jobs("interrupted").await.unwrap();
    assert_eq!(n, 1);
    let job = db.get_job(id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(db.count_processing().await.unwrap(), 0);
}

#[tokio::test]
async fn cancel_all_queued_counts_rows() {
    let db = open_memory().await.unwrap();
    db.add_job("/a", "/da", 1).await.unwrap();
    db.add_job("/b", "/db", 1).await.unwrap();
    let running = db.add_job("/c", "/dc", 5).await.unwrap();
    let claimed = db.claim_next_queued_job().await.unwrap().unwrap();
    assert_eq!(claimed.id, running);

    assert_eq!(db.cancel_all_queued("Cancelled by user").await.unwrap(), 2);
    assert_eq!(db.list_queue().await.unwrap().len(), 1);
}

/// Insert a job with explicit timestamps and outcome.
async fn seed_job(
    db: &crate::job_db::JobDb,
    status: JobStatus,
    created_at: i64,
    took: Option<i64>,
    total: i64,
) {
    let id = db.add_job("/s", "/d", 1).await.unwrap();
    sqlx::query(
        "UPDATE jobs SET status = ?1, created_at = ?2, completed_at = ?3, total_size_bytes = ?4 WHERE id = ?5",
    )
    .bind(status.as_str())
    .bind(created_at)
    .bind(took.map(|t| created_at + t))
    .bind(total)
    .bind(id)
    .execute(&db.pool)
    .await
    .unwrap();
}

#[tokio::test]
async fn stats_report_buckets_by_period_and_day() {
    use crate::job_db::SECS_PER_DAY;

    let db = open_memory().await.unwrap();
    let today = 10 * SECS_PER_DAY;
    let now = today + 3600;
    seed_job(&db, JobStatus::Completed, today, Some(10), 1000).await;
    seed_job(&db, JobStatus::Queued, today + 60, None, 0).await;
    seed_job(&db, JobStatus::Failed, today - SECS_PER_DAY, Some(3), 0).await;
    seed_job(&db, JobStatus::Completed, today - 2 * SECS_PER_DAY + 100, Some(20), 4000).await;
    seed_job(&db, JobStatus::Cancelled, today - 20 * SECS_PER_DAY, Some(1), 0).await;
    // Completed in the same second: no duration, left out of the averages.
    seed_job(&db, JobStatus::Completed, today - 40 * SECS_PER_DAY, Some(0), 500).await;

    let report = db.stats_report(now).await.unwrap();

    assert_eq!(report.today.count, 2);
    assert_eq!(report.today.completed, 1);
    assert_eq!(report.today.bytes, 1000);
    assert_eq!(report.today.avg_duration_secs, 10.0);
    assert_eq!(report.today.avg_speed_bps, 100.0);
    assert_eq!(report.today.success_rate, 50.0);

    assert_eq!(report.week.count, 4);
    assert_eq!(report.week.completed, 2);
    assert_eq!(report.week.failed, 1);
    assert_eq!(report.week.bytes, 5000);
    assert_eq!(report.week.avg_duration_secs, 15.0);
    assert_eq!(report.week.avg_speed_bps, 150.0);

    assert_eq!(report.month.count, 5);
    assert_eq!(report.month.cancelled, 1);
    assert_eq!(report.month.success_rate, 40.0);

    assert_eq!(report.all_time.count, 6);
    assert_eq!(report.all_time.completed, 3);
    assert_eq!(report.all_time.bytes, 5500);
    assert_eq!(report.all_time.avg_duration_secs, 15.0);
    assert_eq!(report.all_time.success_rate, 50.0);

    assert_eq!(report.daily.len(), 7);
    assert_eq!(report.daily[0].day_start, today);
    assert_eq!((report.daily[0].completed, report.daily[0].bytes), (1, 1000));
    assert_eq!(report.daily[1].failed, 1);
    assert_eq!((report.daily[2].completed, report.daily[2].bytes), (1, 4000));
    assert!(report.daily[3..].iter().all(|d| d.completed == 0 && d.failed == 0));
    assert_eq!(report.daily[6].day_start, today - 6 * SECS_PER_DAY);
}

#[tokio::test]
async fn stats_on_empty_database_are_zero() {
    let db = open_memory().await.unwrap();
    let stats = db.transfer_stats(i64::MIN, i64::MAX).await.unwrap();
    assert_eq!(stats, crate::job_db::TransferStats::default());
}

#[test]
fn priority_tier_parsing() {
    assert_eq!("low".parse::<PriorityTier>().unwrap(), PriorityTier::Low);
    assert_eq!("HIGH".parse::<PriorityTier>().unwrap(), PriorityTier::High);
    assert_eq!("1".parse::<PriorityTier>().unwrap(), PriorityTier::Normal);
    assert!("urgent".parse::<PriorityTier>().is_err());
    assert_eq!(PriorityTier::default().value(), 1);
}

#[test]
fn status_strings() {
    for s in [
        JobStatus::Queued,
        JobStatus::Processing,
        JobStatus::Completed,
        JobStatus::Failed,
        JobStatus::Cancelled,
    ] {
        assert_eq!(JobStatus::from_db(s.as_str()), s);
    }
    assert_eq!(JobStatus::from_db("bogus"), JobStatus::Failed);
    assert!(JobStatus::Cancelled.is_terminal());
    assert!(!JobStatus::Processing.is_terminal());
}
