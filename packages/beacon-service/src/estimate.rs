//! Model calls for duration, project and summary answers.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::format_description::well_known::Rfc3339;

use crate::{BeaconService, Error, Result, import::ItemErrorKind, project_match::ProjectCatalog};
use beacon_domain::{
	estimate::{self, DurationEstimate, InvalidResponse, ProjectMatch, Summary},
	heuristics,
	prompt::{self, PromptInput, PromptKind, PromptMessages},
	source::RawActivityItem,
	truncate,
};

const LOG_SNIPPET_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimateTask {
	Duration,
	ProjectMatch,
	Summary,
}

/// Ad-hoc estimation over free text, outside any import.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimateRequest {
	pub task: EstimateTask,
	pub content: String,
	#[serde(default)]
	pub context: Option<String>,
	/// Required for `project_match`; the company's active projects are offered to the model.
	#[serde(default)]
	pub company_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum EstimateResponse {
	Duration(DurationEstimate),
	ProjectMatch(ProjectMatch),
	Summary(Summary),
}

/// Why a model answer could not be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ModelFailure {
	/// The answer arrived but is not valid for the template's schema.
	Invalid(String),
	/// The call failed after retries.
	Request(String),
}
impl ModelFailure {
	pub(crate) fn kind(&self) -> ItemErrorKind {
		match self {
			Self::Invalid(_) => ItemErrorKind::ModelResponseInvalid,
			Self::Request(_) => ItemErrorKind::ModelRequestFailure,
		}
	}

	pub(crate) fn message(&self) -> &str {
		match self {
			Self::Invalid(message) | Self::Request(message) => message,
		}
	}
}

impl BeaconService {
	pub async fn estimate(&self, req: EstimateRequest) -> Result<EstimateResponse> {
		if req.content.trim().is_empty() {
			return Err(Error::field("content", "content must be non-empty."));
		}

		let context = req.context.as_deref().unwrap_or_default();
		let outcome = match req.task {
			EstimateTask::Duration =>
				estimate_text(self, context, &req.content).await.map(EstimateResponse::Duration),
			EstimateTask::Summary =>
				summarize(self, context, &req.content).await.map(EstimateResponse::Summary),
			EstimateTask::ProjectMatch => {
				let Some(company_id) =
					req.company_id.as_deref().filter(|value| !value.trim().is_empty())
				else {
					return Err(Error::field(
						"company_id",
						"company_id is required for project_match.",
					));
				};
				let catalog = ProjectCatalog::new(self.store.list_projects(company_id).await?);

				crate::project_match::match_content(self, &catalog, context, &req.content)
					.await
					.map(EstimateResponse::ProjectMatch)
			},
		};

		outcome.map_err(|failure| Error::Model { message: failure.message().to_string() })
	}
}

/// Duration estimate for one fetched item, using the template for its content kind.
pub(crate) async fn estimate_item(
	service: &BeaconService,
	item: &RawActivityItem,
) -> Result<DurationEstimate, ModelFailure> {
	let baseline = heuristics::baseline_minutes(item);
	let context = item_context(item);

	estimate_duration(service, PromptKind::for_item_kind(item.kind()), &context, &item.body, baseline)
		.await
}

pub(crate) async fn summarize(
	service: &BeaconService,
	context: &str,
	content: &str,
) -> Result<Summary, ModelFailure> {
	let template = prompt::template(PromptKind::Summary);
	let messages = prompt::render(template, &PromptInput { context, content, ..Default::default() });

	ask(service, template.kind, &messages, estimate::parse_summary).await
}

/// Renders and sends one prompt, then validates the answer with `parse`.
pub(crate) async fn ask<T>(
	service: &BeaconService,
	kind: PromptKind,
	messages: &PromptMessages,
	parse: impl FnOnce(&Value) -> Result<T, InvalidResponse>,
) -> Result<T, ModelFailure> {
	let answer = service
		.providers
		.model
		.complete(&service.cfg.providers.llm, service.retry(), messages)
		.await
		.map_err(|err| match err {
			beacon_providers::Error::InvalidResponse { message } => {
				tracing::warn!(prompt = kind.as_str(), %message, "Model answer is not JSON.");

				ModelFailure::Invalid(message)
			},
			other => {
				tracing::warn!(prompt = kind.as_str(), error = %other, "Model request failed.");

				ModelFailure::Request(other.to_string())
			},
		})?;

	parse(&answer).map_err(|err| {
		tracing::warn!(
			prompt = kind.as_str(),
			error = %err,
			snippet = %truncate::snippet(&answer.to_string(), LOG_SNIPPET_CHARS),
			"Model answer failed validation."
		);

		ModelFailure::Invalid(err.message)
	})
}

pub(crate) fn item_context(item: &RawActivityItem) -> String {
	let mut lines = vec![format!("Title: {}", item.title.trim())];

	if let Ok(occurred_at) = item.occurred_at.format(&Rfc3339) {
		lines.push(format!("Occurred at: {occurred_at}"));
	}
	if let Some(minutes) = item.scheduled_minutes() {
		lines.push(format!("Scheduled minutes: {minutes:.0}"));
	}
	if !item.participants.is_empty() {
		lines.push(format!("Participants: {}", item.participants.join(", ")));
	}
	if !item.labels.is_empty() {
		lines.push(format!("Labels: {}", item.labels.join(", ")));
	}

	lines.push(format!("Authored by user: {}", if item.authored_by_user { "yes" } else { "no" }));
	lines.push(format!("Word count: {}", heuristics::word_count(&item.body)));

	lines.join("\n")
}

async fn estimate_text(
	service: &BeaconService,
	context: &str,
	content: &str,
) -> Result<DurationEstimate, ModelFailure> {
	let words = heuristics::word_count(content) as f64;
	let baseline = (words / heuristics::READING_WORDS_PER_MINUTE)
		.ceil()
		.max(heuristics::MIN_ACTIVITY_MINUTES);

	estimate_duration(service, PromptKind::DurationEstimate, context, content, baseline).await
}

async fn estimate_duration(
	service: &BeaconService,
	kind: PromptKind,
	context: &str,
	content: &str,
	baseline: f64,
) -> Result<DurationEstimate, ModelFailure> {
	let cap = f64::from(service.cfg.estimation.max_minutes_per_item);
	let bounds = heuristics::suggested_bounds(baseline, cap);
	let template = prompt::template(kind);
	let messages = prompt::render(
		template,
		&PromptInput {
			context,
			content,
			baseline_minutes: Some(baseline),
			min_minutes: Some(bounds.min_minutes),
			max_minutes: Some(bounds.max_minutes),
			projects_json: None,
		},
	);

	ask(service, template.kind, &messages, |answer| estimate::parse_duration(answer, cap)).await
}

#[cfg(test)]
mod tests {
	use time::macros::datetime;

	use beacon_domain::source::Source;

	use super::*;

	#[test]
	fn context_lists_item_metadata() {
		let item = RawActivityItem {
			external_id: "evt-1".to_string(),
			source: Source::Calendar,
			title: " Weekly sync ".to_string(),
			body: "Agenda: roadmap".to_string(),
			occurred_at: datetime!(2026-03-02 09:00 UTC),
			ends_at: Some(datetime!(2026-03-02 09:45 UTC)),
			participants: vec!["a@example.com".to_string(), "b@example.com".to_string()],
			labels: Vec::new(),
			authored_by_user: true,
			link: None,
		};
		let context = item_context(&item);

		assert!(context.starts_with("Title: Weekly sync\n"));
		assert!(context.contains("Occurred at: 2026-03-02T09:00:00Z"));
		assert!(context.contains("Scheduled minutes: 45"));
		assert!(context.contains("Participants: a@example.com, b@example.com"));
		assert!(context.contains("Authored by user: yes"));
		assert!(context.ends_with("Word count: 2"));
		assert!(!context.contains("Labels:"));
	}

	#[test]
	fn failures_map_to_error_kinds() {
		assert_eq!(
			ModelFailure::Invalid("bad".to_string()).kind(),
			ItemErrorKind::ModelResponseInvalid
		);
		assert_eq!(
			ModelFailure::Request("timeout".to_string()).kind(),
			ItemErrorKind::ModelRequestFailure
		);
	}
}
