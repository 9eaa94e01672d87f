use serde::Serialize;
use serde_json::{Value, json};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	BeaconService, Error, Result,
	import::{ImportResponse, ItemError},
};
use beacon_storage::models::{ImportJob, JobProgress};

#[derive(Debug, Clone, Serialize)]
pub struct ImportJobStatus {
	pub job_id: Uuid,
	pub user_id: String,
	pub company_id: String,
	pub source: String,
	pub status: String,
	pub imported_count: u32,
	pub processed_count: u32,
	pub failed_count: u32,
	pub time_entries_created: u32,
	pub skipped_duplicates: u32,
	pub errors: Vec<ItemError>,
	pub processing_time_ms: Option<i64>,
	#[serde(with = "crate::time_serde")]
	pub started_at: OffsetDateTime,
	#[serde(with = "crate::time_serde::option")]
	pub completed_at: Option<OffsetDateTime>,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
}
impl TryFrom<ImportJob> for ImportJobStatus {
	type Error = Error;

	fn try_from(job: ImportJob) -> Result<Self> {
		let errors = serde_json::from_value(job.errors).map_err(|err| Error::Storage {
			message: format!("Stored job errors are malformed: {err}"),
		})?;

		Ok(Self {
			job_id: job.job_id,
			user_id: job.user_id,
			company_id: job.company_id,
			source: job.source,
			status: job.status,
			imported_count: count(job.imported_count),
			processed_count: count(job.processed_count),
			failed_count: count(job.failed_count),
			time_entries_created: count(job.time_entries_created),
			skipped_duplicates: count(job.skipped_duplicates),
			errors,
			processing_time_ms: job.processing_time_ms,
			started_at: job.started_at,
			completed_at: job.completed_at,
			updated_at: job.updated_at,
		})
	}
}

impl BeaconService {
	pub async fn job_status(&self, user_id: &str, job_id: Uuid) -> Result<ImportJobStatus> {
		let job = self
			.store
			.get_job(user_id, job_id)
			.await?
			.ok_or_else(|| Error::NotFound { message: format!("Import job {job_id} not found.") })?;

		ImportJobStatus::try_from(job)
	}
}

/// How one item left the pipeline.
#[derive(Debug)]
pub(crate) enum ItemOutcome {
	Created,
	Duplicate,
	Failed(ItemError),
}

/// In-memory job record, folded by the orchestrator and mirrored to storage.
#[derive(Debug)]
pub(crate) struct JobTracker {
	imported: u32,
	created: u32,
	duplicates: u32,
	failed: u32,
	errors: Vec<ItemError>,
	max_errors: usize,
}
impl JobTracker {
	pub(crate) fn new(max_errors: usize) -> Self {
		Self { imported: 0, created: 0, duplicates: 0, failed: 0, errors: Vec::new(), max_errors }
	}

	pub(crate) fn add_imported(&mut self, count: usize) {
		self.imported = self.imported.saturating_add(u32::try_from(count).unwrap_or(u32::MAX));
	}

	pub(crate) fn record(&mut self, outcome: ItemOutcome) {
		match outcome {
			ItemOutcome::Created => self.created += 1,
			ItemOutcome::Duplicate => self.duplicates += 1,
			ItemOutcome::Failed(error) => {
				self.failed += 1;

				self.push_error(error);
			},
		}
	}

	/// Records a failure that is not tied to a counted item, such as a failed listing.
	pub(crate) fn push_error(&mut self, error: ItemError) {
		if self.errors.len() < self.max_errors {
			self.errors.push(error);
		}
	}

	pub(crate) fn progress(&self) -> JobProgress {
		JobProgress {
			imported_count: db_count(self.imported),
			processed_count: db_count(self.processed()),
			failed_count: db_count(self.failed),
			time_entries_created: db_count(self.created),
			skipped_duplicates: db_count(self.duplicates),
			errors: Value::Array(self.errors.iter().map(error_json).collect()),
		}
	}

	pub(crate) fn response(&self, job_id: Uuid, processing_time_ms: u64) -> ImportResponse {
		ImportResponse {
			job_id,
			imported_count: self.imported,
			processed_count: self.processed(),
			failed_count: self.failed,
			time_entries_created: self.created,
			skipped_duplicates: self.duplicates,
			processing_time_ms,
			errors: self.errors.clone(),
		}
	}

	fn processed(&self) -> u32 {
		self.created + self.duplicates
	}
}

fn error_json(error: &ItemError) -> Value {
	json!({
		"item_id": error.item_id,
		"kind": error.kind.as_str(),
		"message": error.message,
	})
}

fn count(value: i32) -> u32 {
	u32::try_from(value).unwrap_or_default()
}

fn db_count(value: u32) -> i32 {
	i32::try_from(value).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::import::ItemErrorKind;

	fn failure(id: &str) -> ItemOutcome {
		ItemOutcome::Failed(ItemError {
			item_id: Some(id.to_string()),
			kind: ItemErrorKind::ModelResponseInvalid,
			message: "confidence_score must be within [0, 1], got 1.2.".to_string(),
		})
	}

	#[test]
	fn counts_stay_exact_beyond_error_cap() {
		let mut tracker = JobTracker::new(2);

		tracker.add_imported(5);
		tracker.record(ItemOutcome::Created);
		tracker.record(ItemOutcome::Duplicate);
		tracker.record(failure("a"));
		tracker.record(failure("b"));
		tracker.record(failure("c"));

		let progress = tracker.progress();

		assert_eq!(progress.imported_count, 5);
		assert_eq!(progress.processed_count, 2);
		assert_eq!(progress.failed_count, 3);
		assert_eq!(progress.errors.as_array().map(Vec::len), Some(2));
		assert_eq!(progress.errors[0]["kind"], json!("model_response_invalid"));
		assert_eq!(
			progress.imported_count,
			progress.processed_count + progress.failed_count
		);
	}

	#[test]
	fn stored_errors_read_back_into_status() {
		let mut tracker = JobTracker::new(10);

		tracker.add_imported(1);
		tracker.record(failure("msg-9"));

		let now = OffsetDateTime::now_utc();
		let job = ImportJob {
			job_id: Uuid::new_v4(),
			user_id: "u1".to_string(),
			company_id: "c1".to_string(),
			source: "gmail".to_string(),
			status: "completed".to_string(),
			imported_count: 1,
			processed_count: 0,
			failed_count: 1,
			time_entries_created: 0,
			skipped_duplicates: 0,
			errors: tracker.progress().errors,
			processing_time_ms: Some(12),
			started_at: now,
			completed_at: Some(now),
			updated_at: now,
		};
		let status = ImportJobStatus::try_from(job).expect("Expected readable job.");

		assert_eq!(status.errors.len(), 1);
		assert_eq!(status.errors[0].item_id.as_deref(), Some("msg-9"));
		assert_eq!(status.errors[0].kind, ItemErrorKind::ModelResponseInvalid);
	}
}
