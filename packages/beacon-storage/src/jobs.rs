use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	Error, Result,
	db::Db,
	models::{ImportJob, JobProgress, NewImportJob},
};

pub const STATUS_RUNNING: &str = "running";
pub const STATUS_COMPLETED: &str = "completed";
pub const STATUS_FAILED: &str = "failed";

pub async fn insert_job(db: &Db, job: &NewImportJob) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO import_jobs (job_id, user_id, company_id, source, status, started_at, updated_at)
VALUES ($1, $2, $3, $4, 'running', $5, $5)",
	)
	.bind(job.job_id)
	.bind(job.user_id.as_str())
	.bind(job.company_id.as_str())
	.bind(job.source.as_str())
	.bind(job.started_at)
	.execute(&db.pool)
	.await?;

	Ok(())
}

/// Writes counters for a running job. Returns `false` when the job already left `running`.
pub async fn update_job_progress(db: &Db, job_id: Uuid, progress: &JobProgress) -> Result<bool> {
	let result = sqlx::query(
		"\
UPDATE import_jobs
SET imported_count = $2,
	processed_count = $3,
	failed_count = $4,
	time_entries_created = $5,
	skipped_duplicates = $6,
	errors = $7,
	updated_at = now()
WHERE job_id = $1
	AND status = 'running'",
	)
	.bind(job_id)
	.bind(progress.imported_count)
	.bind(progress.processed_count)
	.bind(progress.failed_count)
	.bind(progress.time_entries_created)
	.bind(progress.skipped_duplicates)
	.bind(&progress.errors)
	.execute(&db.pool)
	.await?;

	Ok(result.rows_affected() == 1)
}

/// Moves a running job to its terminal status. Terminal rows are never rewritten.
pub async fn finish_job(
	db: &Db,
	job_id: Uuid,
	status: &str,
	progress: &JobProgress,
	processing_time_ms: i64,
	completed_at: OffsetDateTime,
) -> Result<bool> {
	if status != STATUS_COMPLETED && status != STATUS_FAILED {
		return Err(Error::InvalidArgument(format!("{status:?} is not a terminal job status.")));
	}

	let result = sqlx::query(
		"\
UPDATE import_jobs
SET status = $2,
	imported_count = $3,
	processed_count = $4,
	failed_count = $5,
	time_entries_created = $6,
	skipped_duplicates = $7,
	errors = $8,
	processing_time_ms = $9,
	completed_at = $10,
	updated_at = $10
WHERE job_id = $1
	AND status = 'running'",
	)
	.bind(job_id)
	.bind(status)
	.bind(progress.imported_count)
	.bind(progress.processed_count)
	.bind(progress.failed_count)
	.bind(progress.time_entries_created)
	.bind(progress.skipped_duplicates)
	.bind(&progress.errors)
	.bind(processing_time_ms)
	.bind(completed_at)
	.execute(&db.pool)
	.await?;

	Ok(result.rows_affected() == 1)
}

/// Jobs are scoped to the user that started them.
pub async fn get_job(db: &Db, user_id: &str, job_id: Uuid) -> Result<Option<ImportJob>> {
	let job = sqlx::query_as::<_, ImportJob>(
		"SELECT * FROM import_jobs WHERE job_id = $1 AND user_id = $2",
	)
	.bind(job_id)
	.bind(user_id)
	.fetch_optional(&db.pool)
	.await?;

	Ok(job)
}
