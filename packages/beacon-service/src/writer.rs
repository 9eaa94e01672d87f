use uuid::Uuid;

use crate::store::Store;
use beacon_domain::entry::TimeEntryDraft;
use beacon_providers::retry::RetryPolicy;
use beacon_storage::models::{InsertOutcome, NewTimeEntry};

pub(crate) fn to_new_entry(draft: &TimeEntryDraft, job_id: Uuid) -> NewTimeEntry {
	NewTimeEntry {
		entry_id: Uuid::new_v4(),
		user_id: draft.user_id.clone(),
		company_id: draft.company_id.clone(),
		job_id: Some(job_id),
		entry_date: draft.date,
		start_time: draft.start_time,
		end_time: draft.end_time,
		duration_hours: draft.duration_hours,
		project_id: draft.project_id,
		project: draft.project.clone(),
		client: draft.client.clone(),
		description: draft.description.clone(),
		status: draft.status.as_str().to_string(),
		source: draft.source.as_str().to_string(),
		external_item_id: draft.external_item_id.clone(),
		billable: draft.billable,
		automated: draft.automated,
		tags: draft.tags.clone(),
		confidence_score: draft.confidence_score,
	}
}

/// Inserts `entry`, trying up to `attempts` times with the policy's backoff between tries. A
/// unique-key conflict is an outcome, not an error, and is never retried.
pub(crate) async fn write_entry(
	store: &dyn Store,
	entry: &NewTimeEntry,
	attempts: u32,
	backoff: &RetryPolicy,
) -> beacon_storage::Result<InsertOutcome> {
	let attempts = attempts.max(1);
	let mut attempt = 1;

	loop {
		match store.insert_time_entry(entry).await {
			Ok(outcome) => return Ok(outcome),
			Err(err) if attempt < attempts => {
				let delay = backoff.backoff_for_attempt(attempt);

				tracing::warn!(
					external_item_id = entry.external_item_id.as_str(),
					attempt,
					delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
					error = %err,
					"Retrying time entry insert."
				);
				tokio::time::sleep(delay).await;

				attempt += 1;
			},
			Err(err) => return Err(err),
		}
	}
}
