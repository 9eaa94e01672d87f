use time::Date;

use crate::{
	Result,
	db::Db,
	models::{InsertOutcome, NewTimeEntry, TimeEntry},
};

/// Inserts the entry unless one already exists for the same source item. Idempotency rests on
/// the `time_entries_source_item_key` unique index, so concurrent imports cannot double-write.
pub async fn insert_time_entry(db: &Db, entry: &NewTimeEntry) -> Result<InsertOutcome> {
	let result = sqlx::query(
		"\
INSERT INTO time_entries (
	entry_id,
	user_id,
	company_id,
	job_id,
	entry_date,
	start_time,
	end_time,
	duration_hours,
	project_id,
	project,
	client,
	description,
	status,
	source,
	external_item_id,
	billable,
	automated,
	tags,
	confidence_score
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
ON CONFLICT (user_id, source, external_item_id) DO NOTHING",
	)
	.bind(entry.entry_id)
	.bind(entry.user_id.as_str())
	.bind(entry.company_id.as_str())
	.bind(entry.job_id)
	.bind(entry.entry_date)
	.bind(entry.start_time)
	.bind(entry.end_time)
	.bind(entry.duration_hours)
	.bind(entry.project_id)
	.bind(entry.project.as_deref())
	.bind(entry.client.as_deref())
	.bind(entry.description.as_str())
	.bind(entry.status.as_str())
	.bind(entry.source.as_str())
	.bind(entry.external_item_id.as_str())
	.bind(entry.billable)
	.bind(entry.automated)
	.bind(&entry.tags)
	.bind(entry.confidence_score)
	.execute(&db.pool)
	.await?;

	if result.rows_affected() == 1 { Ok(InsertOutcome::Created) } else { Ok(InsertOutcome::Duplicate) }
}

/// Subset of `external_item_ids` that already has an entry for this user and source.
pub async fn existing_item_ids(
	db: &Db,
	user_id: &str,
	source: &str,
	external_item_ids: &[String],
) -> Result<Vec<String>> {
	if external_item_ids.is_empty() {
		return Ok(Vec::new());
	}

	let ids: Vec<String> = sqlx::query_scalar(
		"\
SELECT external_item_id
FROM time_entries
WHERE user_id = $1
	AND source = $2
	AND external_item_id = ANY($3)",
	)
	.bind(user_id)
	.bind(source)
	.bind(external_item_ids)
	.fetch_all(&db.pool)
	.await?;

	Ok(ids)
}

pub async fn list_time_entries(
	db: &Db,
	user_id: &str,
	from: Date,
	to: Date,
) -> Result<Vec<TimeEntry>> {
	let rows = sqlx::query_as::<_, TimeEntry>(
		"\
SELECT *
FROM time_entries
WHERE user_id = $1
	AND entry_date >= $2
	AND entry_date <= $3
ORDER BY start_time, entry_id",
	)
	.bind(user_id)
	.bind(from)
	.bind(to)
	.fetch_all(&db.pool)
	.await?;

	Ok(rows)
}
