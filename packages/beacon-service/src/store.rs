//! Persistence seam between the service and Postgres.

use std::{
	collections::HashMap,
	sync::{
		Mutex,
		atomic::{AtomicUsize, Ordering},
	},
};

use time::OffsetDateTime;
use uuid::Uuid;

use crate::BoxFuture;
use beacon_storage::{
	Result,
	db::Db,
	entries, jobs,
	models::{
		ImportJob, InsertOutcome, JobProgress, NewImportJob, NewTimeEntry, PreferencesRow, Project,
	},
	preferences, projects,
};

pub trait Store
where
	Self: Send + Sync,
{
	fn existing_item_ids<'a>(
		&'a self,
		user_id: &'a str,
		source: &'a str,
		external_item_ids: &'a [String],
	) -> BoxFuture<'a, Result<Vec<String>>>;

	fn insert_time_entry<'a>(&'a self, entry: &'a NewTimeEntry)
	-> BoxFuture<'a, Result<InsertOutcome>>;

	fn insert_job<'a>(&'a self, job: &'a NewImportJob) -> BoxFuture<'a, Result<()>>;

	fn update_job_progress<'a>(
		&'a self,
		job_id: Uuid,
		progress: &'a JobProgress,
	) -> BoxFuture<'a, Result<bool>>;

	fn finish_job<'a>(
		&'a self,
		job_id: Uuid,
		status: &'a str,
		progress: &'a JobProgress,
		processing_time_ms: i64,
		completed_at: OffsetDateTime,
	) -> BoxFuture<'a, Result<bool>>;

	fn get_job<'a>(
		&'a self,
		user_id: &'a str,
		job_id: Uuid,
	) -> BoxFuture<'a, Result<Option<ImportJob>>>;

	fn get_preferences<'a>(&'a self, user_id: &'a str)
	-> BoxFuture<'a, Result<Option<PreferencesRow>>>;

	fn upsert_preferences<'a>(&'a self, row: &'a PreferencesRow) -> BoxFuture<'a, Result<()>>;

	fn list_projects<'a>(&'a self, company_id: &'a str) -> BoxFuture<'a, Result<Vec<Project>>>;
}

impl Store for Db {
	fn existing_item_ids<'a>(
		&'a self,
		user_id: &'a str,
		source: &'a str,
		external_item_ids: &'a [String],
	) -> BoxFuture<'a, Result<Vec<String>>> {
		Box::pin(entries::existing_item_ids(self, user_id, source, external_item_ids))
	}

	fn insert_time_entry<'a>(
		&'a self,
		entry: &'a NewTimeEntry,
	) -> BoxFuture<'a, Result<InsertOutcome>> {
		Box::pin(entries::insert_time_entry(self, entry))
	}

	fn insert_job<'a>(&'a self, job: &'a NewImportJob) -> BoxFuture<'a, Result<()>> {
		Box::pin(jobs::insert_job(self, job))
	}

	fn update_job_progress<'a>(
		&'a self,
		job_id: Uuid,
		progress: &'a JobProgress,
	) -> BoxFuture<'a, Result<bool>> {
		Box::pin(jobs::update_job_progress(self, job_id, progress))
	}

	fn finish_job<'a>(
		&'a self,
		job_id: Uuid,
		status: &'a str,
		progress: &'a JobProgress,
		processing_time_ms: i64,
		completed_at: OffsetDateTime,
	) -> BoxFuture<'a, Result<bool>> {
		Box::pin(jobs::finish_job(self, job_id, status, progress, processing_time_ms, completed_at))
	}

	fn get_job<'a>(
		&'a self,
		user_id: &'a str,
		job_id: Uuid,
	) -> BoxFuture<'a, Result<Option<ImportJob>>> {
		Box::pin(jobs::get_job(self, user_id, job_id))
	}

	fn get_preferences<'a>(
		&'a self,
		user_id: &'a str,
	) -> BoxFuture<'a, Result<Option<PreferencesRow>>> {
		Box::pin(preferences::get_preferences(self, user_id))
	}

	fn upsert_preferences<'a>(&'a self, row: &'a PreferencesRow) -> BoxFuture<'a, Result<()>> {
		Box::pin(preferences::upsert_preferences(self, row))
	}

	fn list_projects<'a>(&'a self, company_id: &'a str) -> BoxFuture<'a, Result<Vec<Project>>> {
		Box::pin(projects::list_active_projects(self, company_id))
	}
}

/// Process-local store with the same uniqueness and job-status rules as the Postgres schema.
/// Backs tests and local runs without a database.
#[derive(Default)]
pub struct MemoryStore {
	state: Mutex<MemoryState>,
	insert_failures: AtomicUsize,
}

#[derive(Default)]
struct MemoryState {
	entries: Vec<NewTimeEntry>,
	jobs: HashMap<Uuid, ImportJob>,
	preferences: HashMap<String, PreferencesRow>,
	projects: Vec<Project>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_projects(projects: Vec<Project>) -> Self {
		let store = Self::default();

		store.lock().projects = projects;

		store
	}

	pub fn entries(&self) -> Vec<NewTimeEntry> {
		self.lock().entries.clone()
	}

	pub fn jobs(&self) -> Vec<ImportJob> {
		self.lock().jobs.values().cloned().collect()
	}

	/// Makes the next `count` entry inserts fail as if the pool were exhausted.
	pub fn fail_next_inserts(&self, count: usize) {
		self.insert_failures.store(count, Ordering::SeqCst);
	}

	fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
		self.state.lock().unwrap_or_else(|err| err.into_inner())
	}

	fn take_insert_failure(&self) -> bool {
		self.insert_failures
			.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
			.is_ok()
	}
}

impl Store for MemoryStore {
	fn existing_item_ids<'a>(
		&'a self,
		user_id: &'a str,
		source: &'a str,
		external_item_ids: &'a [String],
	) -> BoxFuture<'a, Result<Vec<String>>> {
		let state = self.lock();
		let existing = external_item_ids
			.iter()
			.filter(|id| {
				state.entries.iter().any(|entry| {
					entry.user_id == user_id
						&& entry.source == source
						&& &entry.external_item_id == *id
				})
			})
			.cloned()
			.collect();

		Box::pin(async move { Ok(existing) })
	}

	fn insert_time_entry<'a>(
		&'a self,
		entry: &'a NewTimeEntry,
	) -> BoxFuture<'a, Result<InsertOutcome>> {
		if self.take_insert_failure() {
			let err = beacon_storage::Error::from(sqlx::Error::PoolTimedOut);

			return Box::pin(async move { Err(err) });
		}

		let mut state = self.lock();
		let duplicate = state.entries.iter().any(|existing| {
			existing.user_id == entry.user_id
				&& existing.source == entry.source
				&& existing.external_item_id == entry.external_item_id
		});
		let outcome = if duplicate {
			InsertOutcome::Duplicate
		} else {
			state.entries.push(entry.clone());

			InsertOutcome::Created
		};

		Box::pin(async move { Ok(outcome) })
	}

	fn insert_job<'a>(&'a self, job: &'a NewImportJob) -> BoxFuture<'a, Result<()>> {
		let row = ImportJob {
			job_id: job.job_id,
			user_id: job.user_id.clone(),
			company_id: job.company_id.clone(),
			source: job.source.clone(),
			status: jobs::STATUS_RUNNING.to_string(),
			imported_count: 0,
			processed_count: 0,
			failed_count: 0,
			time_entries_created: 0,
			skipped_duplicates: 0,
			errors: serde_json::Value::Array(Vec::new()),
			processing_time_ms: None,
			started_at: job.started_at,
			completed_at: None,
			updated_at: job.started_at,
		};

		self.lock().jobs.insert(job.job_id, row);

		Box::pin(async { Ok(()) })
	}

	fn update_job_progress<'a>(
		&'a self,
		job_id: Uuid,
		progress: &'a JobProgress,
	) -> BoxFuture<'a, Result<bool>> {
		let mut state = self.lock();
		let updated = match state.jobs.get_mut(&job_id) {
			Some(job) if job.status == jobs::STATUS_RUNNING => {
				apply_progress(job, progress);

				job.updated_at = OffsetDateTime::now_utc();

				true
			},
			_ => false,
		};

		Box::pin(async move { Ok(updated) })
	}

	fn finish_job<'a>(
		&'a self,
		job_id: Uuid,
		status: &'a str,
		progress: &'a JobProgress,
		processing_time_ms: i64,
		completed_at: OffsetDateTime,
	) -> BoxFuture<'a, Result<bool>> {
		if status != jobs::STATUS_COMPLETED && status != jobs::STATUS_FAILED {
			let err = beacon_storage::Error::InvalidArgument(format!(
				"{status:?} is not a terminal job status."
			));

			return Box::pin(async move { Err(err) });
		}

		let mut state = self.lock();
		let finished = match state.jobs.get_mut(&job_id) {
			Some(job) if job.status == jobs::STATUS_RUNNING => {
				apply_progress(job, progress);

				job.status = status.to_string();
				job.processing_time_ms = Some(processing_time_ms);
				job.completed_at = Some(completed_at);
				job.updated_at = completed_at;

				true
			},
			_ => false,
		};

		Box::pin(async move { Ok(finished) })
	}

	fn get_job<'a>(
		&'a self,
		user_id: &'a str,
		job_id: Uuid,
	) -> BoxFuture<'a, Result<Option<ImportJob>>> {
		let job = self.lock().jobs.get(&job_id).filter(|job| job.user_id == user_id).cloned();

		Box::pin(async move { Ok(job) })
	}

	fn get_preferences<'a>(
		&'a self,
		user_id: &'a str,
	) -> BoxFuture<'a, Result<Option<PreferencesRow>>> {
		let row = self.lock().preferences.get(user_id).cloned();

		Box::pin(async move { Ok(row) })
	}

	fn upsert_preferences<'a>(&'a self, row: &'a PreferencesRow) -> BoxFuture<'a, Result<()>> {
		self.lock().preferences.insert(row.user_id.clone(), row.clone());

		Box::pin(async { Ok(()) })
	}

	fn list_projects<'a>(&'a self, company_id: &'a str) -> BoxFuture<'a, Result<Vec<Project>>> {
		let projects = self
			.lock()
			.projects
			.iter()
			.filter(|project| project.company_id == company_id)
			.cloned()
			.collect();

		Box::pin(async move { Ok(projects) })
	}
}

fn apply_progress(job: &mut ImportJob, progress: &JobProgress) {
	job.imported_count = progress.imported_count;
	job.processed_count = progress.processed_count;
	job.failed_count = progress.failed_count;
	job.time_entries_created = progress.time_entries_created;
	job.skipped_duplicates = progress.skipped_duplicates;
	job.errors = progress.errors.clone();
}
