use serde_json::Value;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TimeEntry {
	pub entry_id: Uuid,
	pub user_id: String,
	pub company_id: String,
	pub job_id: Option<Uuid>,
	pub entry_date: Date,
	pub start_time: OffsetDateTime,
	pub end_time: OffsetDateTime,
	pub duration_hours: f64,
	pub project_id: Option<Uuid>,
	pub project: Option<String>,
	pub client: Option<String>,
	pub description: String,
	pub status: String,
	pub source: String,
	pub external_item_id: String,
	pub billable: bool,
	pub automated: bool,
	pub tags: Vec<String>,
	pub confidence_score: f64,
	pub created_at: OffsetDateTime,
}

/// Row to insert; `created_at` is assigned by the database.
#[derive(Debug, Clone)]
pub struct NewTimeEntry {
	pub entry_id: Uuid,
	pub user_id: String,
	pub company_id: String,
	pub job_id: Option<Uuid>,
	pub entry_date: Date,
	pub start_time: OffsetDateTime,
	pub end_time: OffsetDateTime,
	pub duration_hours: f64,
	pub project_id: Option<Uuid>,
	pub project: Option<String>,
	pub client: Option<String>,
	pub description: String,
	pub status: String,
	pub source: String,
	pub external_item_id: String,
	pub billable: bool,
	pub automated: bool,
	pub tags: Vec<String>,
	pub confidence_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
	Created,
	/// An entry already exists for the same `(user_id, source, external_item_id)`.
	Duplicate,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ImportJob {
	pub job_id: Uuid,
	pub user_id: String,
	pub company_id: String,
	pub source: String,
	pub status: String,
	pub imported_count: i32,
	pub processed_count: i32,
	pub failed_count: i32,
	pub time_entries_created: i32,
	pub skipped_duplicates: i32,
	pub errors: Value,
	pub processing_time_ms: Option<i64>,
	pub started_at: OffsetDateTime,
	pub completed_at: Option<OffsetDateTime>,
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewImportJob {
	pub job_id: Uuid,
	pub user_id: String,
	pub company_id: String,
	pub source: String,
	pub started_at: OffsetDateTime,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobProgress {
	pub imported_count: i32,
	pub processed_count: i32,
	pub failed_count: i32,
	pub time_entries_created: i32,
	pub skipped_duplicates: i32,
	pub errors: Value,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PreferencesRow {
	pub user_id: String,
	pub confidence_threshold: i16,
	pub auto_approve_enabled: bool,
	pub description_length: String,
	pub only_opened_emails: bool,
	pub skip_promotional: bool,
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Project {
	pub project_id: Uuid,
	pub company_id: String,
	pub name: String,
	pub client_name: Option<String>,
	pub client_is_internal: bool,
	pub keywords: Vec<String>,
}
