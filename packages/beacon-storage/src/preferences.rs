use crate::{Result, db::Db, models::PreferencesRow};

pub async fn get_preferences(db: &Db, user_id: &str) -> Result<Option<PreferencesRow>> {
	let row = sqlx::query_as::<_, PreferencesRow>(
		"SELECT * FROM user_preferences WHERE user_id = $1",
	)
	.bind(user_id)
	.fetch_optional(&db.pool)
	.await?;

	Ok(row)
}

pub async fn upsert_preferences(db: &Db, row: &PreferencesRow) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO user_preferences (
	user_id,
	confidence_threshold,
	auto_approve_enabled,
	description_length,
	only_opened_emails,
	skip_promotional,
	updated_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7)
ON CONFLICT (user_id) DO UPDATE
SET confidence_threshold = EXCLUDED.confidence_threshold,
	auto_approve_enabled = EXCLUDED.auto_approve_enabled,
	description_length = EXCLUDED.description_length,
	only_opened_emails = EXCLUDED.only_opened_emails,
	skip_promotional = EXCLUDED.skip_promotional,
	updated_at = EXCLUDED.updated_at",
	)
	.bind(row.user_id.as_str())
	.bind(row.confidence_threshold)
	.bind(row.auto_approve_enabled)
	.bind(row.description_length.as_str())
	.bind(row.only_opened_emails)
	.bind(row.skip_promotional)
	.bind(row.updated_at)
	.execute(&db.pool)
	.await?;

	Ok(())
}
