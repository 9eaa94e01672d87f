//! Import orchestration: fetch, de-duplicate, estimate, write, and account for every item.

use std::{collections::HashSet, time::Instant};

use futures::{StreamExt as _, stream};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::{
	BeaconService, Error, Result, estimate,
	jobs::{ItemOutcome, JobTracker},
	project_match::{self, ProjectCatalog},
	writer,
};
use beacon_domain::{
	entry::{self, DraftArgs},
	preferences::{DescriptionLength, Preferences},
	source::{RawActivityItem, Source},
};
use beacon_providers::SourceQuery;
use beacon_storage::{
	jobs::{STATUS_COMPLETED, STATUS_FAILED},
	models::{InsertOutcome, NewImportJob},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRequest {
	pub user_id: String,
	pub company_id: String,
	pub source: Source,
	pub date_range: DateRange,
	#[serde(default)]
	pub filters: ImportFilters,
	#[serde(default)]
	pub max_items: Option<u32>,
}

/// Inclusive calendar dates in UTC. A missing `end` means today.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateRange {
	#[serde(with = "crate::time_serde::date")]
	pub start: Date,
	#[serde(default, with = "crate::time_serde::date::option")]
	pub end: Option<Date>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportFilters {
	pub query: Option<String>,
	pub calendar_id: Option<String>,
	pub folder_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportResponse {
	pub job_id: Uuid,
	pub imported_count: u32,
	pub processed_count: u32,
	pub failed_count: u32,
	pub time_entries_created: u32,
	pub skipped_duplicates: u32,
	pub processing_time_ms: u64,
	pub errors: Vec<ItemError>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemError {
	pub item_id: Option<String>,
	pub kind: ItemErrorKind,
	pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemErrorKind {
	SourceFetchFailure,
	ModelResponseInvalid,
	ModelRequestFailure,
	PersistenceFailure,
}
impl ItemErrorKind {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::SourceFetchFailure => "source_fetch_failure",
			Self::ModelResponseInvalid => "model_response_invalid",
			Self::ModelRequestFailure => "model_request_failure",
			Self::PersistenceFailure => "persistence_failure",
		}
	}
}

struct ItemContext<'a> {
	service: &'a BeaconService,
	user_id: &'a str,
	company_id: &'a str,
	job_id: Uuid,
	preferences: &'a Preferences,
	catalog: Option<&'a ProjectCatalog>,
}

struct Job<'a> {
	service: &'a BeaconService,
	job_id: Uuid,
	started: Instant,
	tracker: JobTracker,
}
impl Job<'_> {
	async fn save_progress(&self) {
		if let Err(err) =
			self.service.store.update_job_progress(self.job_id, &self.tracker.progress()).await
		{
			tracing::warn!(job_id = %self.job_id, error = %err, "Failed to persist job progress.");
		}
	}

	async fn finish(&self, status: &str) -> Result<ImportResponse> {
		let elapsed_ms = u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX);

		self.service
			.store
			.finish_job(
				self.job_id,
				status,
				&self.tracker.progress(),
				i64::try_from(elapsed_ms).unwrap_or(i64::MAX),
				OffsetDateTime::now_utc(),
			)
			.await?;

		Ok(self.tracker.response(self.job_id, elapsed_ms))
	}

	/// Marks the job failed and hands back `err`. A failure to record the failure is logged.
	async fn fail(&mut self, kind: ItemErrorKind, err: Error) -> Error {
		self.tracker.push_error(ItemError { item_id: None, kind, message: err.to_string() });

		if let Err(finish_err) = self.finish(STATUS_FAILED).await {
			tracing::error!(job_id = %self.job_id, error = %finish_err, "Failed to mark job failed.");
		}

		err
	}
}

impl BeaconService {
	pub async fn import(&self, req: ImportRequest, source_token: &str) -> Result<ImportResponse> {
		let (start, end) = self.validate_import(&req, source_token)?;
		let max_items = req.max_items.unwrap_or(self.cfg.import.default_max_items);
		let (preferences, _) = crate::preferences::load_preferences(self, &req.user_id).await?;
		let catalog = if self.cfg.estimation.match_projects {
			let catalog = ProjectCatalog::new(self.store.list_projects(&req.company_id).await?);

			(!catalog.is_empty()).then_some(catalog)
		} else {
			None
		};
		let job_id = Uuid::new_v4();

		self.store
			.insert_job(&NewImportJob {
				job_id,
				user_id: req.user_id.clone(),
				company_id: req.company_id.clone(),
				source: req.source.as_str().to_string(),
				started_at: OffsetDateTime::now_utc(),
			})
			.await?;

		tracing::info!(
			%job_id,
			user_id = req.user_id.as_str(),
			source = req.source.as_str(),
			%start,
			%end,
			max_items,
			"Import started."
		);

		let mut job = Job {
			service: self,
			job_id,
			started: Instant::now(),
			tracker: JobTracker::new(self.cfg.import.max_errors as usize),
		};
		let query = SourceQuery {
			start: start.midnight().assume_utc(),
			end: end.midnight().assume_utc() + time::Duration::DAY,
			max_items: max_items as usize,
			query: req.filters.query.clone(),
			calendar_id: req.filters.calendar_id.clone(),
			folder_id: req.filters.folder_id.clone(),
			only_opened_emails: preferences.only_opened_emails,
			skip_promotional: preferences.skip_promotional,
		};
		let fetched = match self
			.providers
			.source
			.fetch(&self.cfg.sources, self.retry(), req.source, source_token, &query)
			.await
		{
			Ok(fetched) => fetched,
			Err(err) => {
				let fatal = if err.is_auth_failure() {
					Error::SourceAuthFailed { message: err.to_string() }
				} else {
					Error::SourceUnavailable { message: err.to_string() }
				};

				tracing::warn!(%job_id, error = %err, "Source fetch failed.");

				return Err(job.fail(ItemErrorKind::SourceFetchFailure, fatal).await);
			},
		};

		job.tracker.add_imported(fetched.items.len() + fetched.failures.len());

		for failure in fetched.failures {
			job.tracker.record(ItemOutcome::Failed(ItemError {
				item_id: Some(failure.item_id),
				kind: ItemErrorKind::SourceFetchFailure,
				message: failure.message,
			}));
		}

		let pending = match self.skip_known_items(&req, fetched.items, &mut job.tracker).await {
			Ok(pending) => pending,
			Err(err) => return Err(job.fail(ItemErrorKind::PersistenceFailure, err).await),
		};

		job.save_progress().await;

		let ctx = ItemContext {
			service: self,
			user_id: &req.user_id,
			company_id: &req.company_id,
			job_id,
			preferences: &preferences,
			catalog: catalog.as_ref(),
		};
		let concurrency = self.cfg.import.worker_concurrency.max(1) as usize;
		let mut outcomes = stream::iter(pending)
			.map(|item| {
				let ctx = &ctx;

				async move { process_item(ctx, &item).await }
			})
			.buffer_unordered(concurrency);

		while let Some(outcome) = outcomes.next().await {
			job.tracker.record(outcome);
			job.save_progress().await;
		}

		let response = job.finish(STATUS_COMPLETED).await?;

		tracing::info!(
			%job_id,
			imported = response.imported_count,
			processed = response.processed_count,
			failed = response.failed_count,
			created = response.time_entries_created,
			duplicates = response.skipped_duplicates,
			processing_time_ms = response.processing_time_ms,
			"Import completed."
		);

		Ok(response)
	}

	fn validate_import(&self, req: &ImportRequest, source_token: &str) -> Result<(Date, Date)> {
		if req.user_id.trim().is_empty() {
			return Err(Error::field("user_id", "user_id must be non-empty."));
		}
		if req.company_id.trim().is_empty() {
			return Err(Error::field("company_id", "company_id must be non-empty."));
		}
		if source_token.trim().is_empty() {
			return Err(Error::field("source_token", "A source access token is required."));
		}

		let start = req.date_range.start;
		let end = req.date_range.end.unwrap_or_else(|| OffsetDateTime::now_utc().date());

		if start > end {
			return Err(Error::field(
				"date_range",
				format!("start {start} must not be after end {end}."),
			));
		}
		if end == Date::MAX {
			return Err(Error::field("date_range", "end is out of range."));
		}

		let cap = self.cfg.import.max_items_cap;

		if let Some(max_items) = req.max_items
			&& !(1..=cap).contains(&max_items)
		{
			return Err(Error::field(
				"max_items",
				format!("max_items must be in the range 1-{cap}, got {max_items}."),
			));
		}

		Ok((start, end))
	}

	/// Drops items that already have an entry, or repeat an earlier item in this batch, counting
	/// each as a skipped duplicate.
	async fn skip_known_items(
		&self,
		req: &ImportRequest,
		items: Vec<RawActivityItem>,
		tracker: &mut JobTracker,
	) -> Result<Vec<RawActivityItem>> {
		let ids: Vec<String> = items.iter().map(|item| item.external_id.clone()).collect();
		let existing: HashSet<String> = self
			.store
			.existing_item_ids(&req.user_id, req.source.as_str(), &ids)
			.await?
			.into_iter()
			.collect();
		let mut seen = HashSet::new();
		let mut pending = Vec::with_capacity(items.len());

		for item in items {
			if existing.contains(&item.external_id) || !seen.insert(item.external_id.clone()) {
				tracker.record(ItemOutcome::Duplicate);
			} else {
				pending.push(item);
			}
		}

		Ok(pending)
	}
}

async fn process_item(ctx: &ItemContext<'_>, item: &RawActivityItem) -> ItemOutcome {
	let service = ctx.service;
	let estimate = match estimate::estimate_item(service, item).await {
		Ok(estimate) => estimate,
		Err(failure) =>
			return ItemOutcome::Failed(ItemError {
				item_id: Some(item.external_id.clone()),
				kind: failure.kind(),
				message: failure.message().to_string(),
			}),
	};
	let project = match ctx.catalog {
		Some(catalog) => project_match::match_item(service, catalog, item).await.unwrap_or_else(
			|failure| {
				tracing::warn!(
					item_id = item.external_id.as_str(),
					error = failure.message(),
					"Project match failed; writing entry without a project."
				);

				None
			},
		),
		None => None,
	};
	let summary = if ctx.preferences.description_length == DescriptionLength::Detailed {
		match estimate::summarize(service, &estimate::item_context(item), &item.body).await {
			Ok(summary) => Some(summary.summary),
			Err(failure) => {
				tracing::warn!(
					item_id = item.external_id.as_str(),
					error = failure.message(),
					"Summary failed; using the estimate reasoning."
				);

				None
			},
		}
	} else {
		None
	};
	let draft = entry::draft_entry(DraftArgs {
		user_id: ctx.user_id,
		company_id: ctx.company_id,
		item,
		estimate: &estimate,
		project: project.as_ref(),
		summary: summary.as_deref(),
		preferences: ctx.preferences,
	});
	let row = writer::to_new_entry(&draft, ctx.job_id);

	match writer::write_entry(
		service.store.as_ref(),
		&row,
		service.cfg.retry.persistence_attempts,
		service.retry(),
	)
	.await
	{
		Ok(InsertOutcome::Created) => ItemOutcome::Created,
		Ok(InsertOutcome::Duplicate) => ItemOutcome::Duplicate,
		Err(err) => {
			tracing::error!(
				item_id = item.external_id.as_str(),
				error = %err,
				"Failed to write time entry."
			);

			ItemOutcome::Failed(ItemError {
				item_id: Some(item.external_id.clone()),
				kind: ItemErrorKind::PersistenceFailure,
				message: err.to_string(),
			})
		},
	}
}
