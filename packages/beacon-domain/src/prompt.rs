//! Prompt templates for the estimation engine.
//!
//! Templates are plain data. Adding a content type means adding a row to [`TEMPLATES`]; the
//! rendering and validation paths do not branch on the template kind beyond its schema.

use serde::{Deserialize, Serialize};

use crate::{
	source::ItemKind,
	truncate::truncate_chars,
};

pub const BASE_RULES: &str = "You are a time-tracking assistant that estimates how long knowledge work took. \
Respond with a single JSON object only, with no prose and no code fences. \
The object must match the provided schema exactly, with every field present. \
confidence_score must be a number between 0 and 1. \
Minute values must be non-negative numbers and must stay within the stated bounds.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptKind {
	EmailAnalysis,
	DurationEstimate,
	ProjectMatch,
	Summary,
	MeetingAnalysis,
	DocumentAnalysis,
}
impl PromptKind {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::EmailAnalysis => "email_analysis",
			Self::DurationEstimate => "duration_estimate",
			Self::ProjectMatch => "project_match",
			Self::Summary => "summary",
			Self::MeetingAnalysis => "meeting_analysis",
			Self::DocumentAnalysis => "document_analysis",
		}
	}

	pub fn for_item_kind(kind: ItemKind) -> Self {
		match kind {
			ItemKind::Email => Self::EmailAnalysis,
			ItemKind::Meeting => Self::MeetingAnalysis,
			ItemKind::Document => Self::DocumentAnalysis,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSchema {
	Duration,
	ProjectMatch,
	Summary,
}
impl ResponseSchema {
	pub fn example(self) -> &'static str {
		match self {
			Self::Duration =>
				r#"{"estimated_minutes": 0, "confidence_score": 0.0, "reasoning": "string", "min_minutes": 0, "max_minutes": 0}"#,
			Self::ProjectMatch =>
				r#"{"project_id": "string|null", "confidence_score": 0.0, "reasoning": "string", "alternatives": [{"project_id": "string", "confidence_score": 0.0}]}"#,
			Self::Summary =>
				r#"{"summary": "string", "key_points": ["string"], "category": "string"}"#,
		}
	}
}

#[derive(Debug, Clone, Copy)]
pub struct PromptTemplate {
	pub kind: PromptKind,
	pub max_content_chars: usize,
	pub schema: ResponseSchema,
	pub task: &'static str,
	pub user: &'static str,
}

pub const TEMPLATES: [PromptTemplate; 6] = [
	PromptTemplate {
		kind: PromptKind::EmailAnalysis,
		max_content_chars: 2_000,
		schema: ResponseSchema::Duration,
		task: "Estimate the minutes the user spent reading, thinking about, and replying to this email.",
		user: "Return JSON matching this exact schema:\n{schema}\nBounds: between {min_minutes} and {max_minutes} minutes. Word-count baseline: {baseline} minutes.\nEmail metadata:\n{context}\nEmail body:\n{content}",
	},
	PromptTemplate {
		kind: PromptKind::DurationEstimate,
		max_content_chars: 1_500,
		schema: ResponseSchema::Duration,
		task: "Estimate the minutes of focused work the described activity represents.",
		user: "Return JSON matching this exact schema:\n{schema}\nBounds: between {min_minutes} and {max_minutes} minutes. Word-count baseline: {baseline} minutes.\nContext:\n{context}\nActivity:\n{content}",
	},
	PromptTemplate {
		kind: PromptKind::ProjectMatch,
		max_content_chars: 1_000,
		schema: ResponseSchema::ProjectMatch,
		task: "Pick the project this activity belongs to, or null when none fits. List at most three ranked alternatives using only the given project ids.",
		user: "Return JSON matching this exact schema:\n{schema}\nKnown projects as JSON:\n{projects}\nContext:\n{context}\nActivity:\n{content}",
	},
	PromptTemplate {
		kind: PromptKind::Summary,
		max_content_chars: 1_000,
		schema: ResponseSchema::Summary,
		task: "Summarize the activity in one sentence suitable for a timesheet line, with up to three key points.",
		user: "Return JSON matching this exact schema:\n{schema}\nContext:\n{context}\nActivity:\n{content}",
	},
	PromptTemplate {
		kind: PromptKind::MeetingAnalysis,
		max_content_chars: 800,
		schema: ResponseSchema::Duration,
		task: "Estimate the minutes the user spent on this meeting, including preparation and follow-up.",
		user: "Return JSON matching this exact schema:\n{schema}\nBounds: between {min_minutes} and {max_minutes} minutes. Scheduled length baseline: {baseline} minutes.\nMeeting metadata:\n{context}\nMeeting description:\n{content}",
	},
	PromptTemplate {
		kind: PromptKind::DocumentAnalysis,
		max_content_chars: 500,
		schema: ResponseSchema::Duration,
		task: "Estimate the minutes the user spent creating or editing this document.",
		user: "Return JSON matching this exact schema:\n{schema}\nBounds: between {min_minutes} and {max_minutes} minutes. Word-count baseline: {baseline} minutes.\nDocument metadata:\n{context}\nDocument excerpt:\n{content}",
	},
];

#[derive(Debug, Clone, Default)]
pub struct PromptInput<'a> {
	pub context: &'a str,
	pub content: &'a str,
	pub baseline_minutes: Option<f64>,
	pub min_minutes: Option<f64>,
	pub max_minutes: Option<f64>,
	pub projects_json: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptMessages {
	pub system_instruction: String,
	pub user_instruction: String,
}

pub fn template(kind: PromptKind) -> &'static PromptTemplate {
	TEMPLATES
		.iter()
		.find(|template| template.kind == kind)
		.unwrap_or(&TEMPLATES[1])
}

pub fn render(template: &PromptTemplate, input: &PromptInput<'_>) -> PromptMessages {
	let content = truncate_chars(input.content, template.max_content_chars);
	let baseline = input.baseline_minutes.map(format_minutes).unwrap_or_default();
	let min_minutes = input.min_minutes.map(format_minutes).unwrap_or_default();
	let max_minutes = input.max_minutes.map(format_minutes).unwrap_or_default();
	let user_instruction = fill(
		template.user,
		&[
			("schema", template.schema.example()),
			("baseline", baseline.as_str()),
			("min_minutes", min_minutes.as_str()),
			("max_minutes", max_minutes.as_str()),
			("projects", input.projects_json.unwrap_or("[]")),
			("context", input.context),
			("content", content),
		],
	);

	PromptMessages {
		system_instruction: format!("{BASE_RULES} {}", template.task),
		user_instruction,
	}
}

/// Single-pass `{name}` substitution. Substituted values are never rescanned, so user content
/// containing braces is passed through verbatim.
fn fill(pattern: &str, vars: &[(&str, &str)]) -> String {
	let mut out = String::with_capacity(pattern.len() + 256);
	let mut rest = pattern;

	while let Some(open) = rest.find('{') {
		out.push_str(&rest[..open]);

		let after = &rest[open + 1..];
		let replaced = after.find('}').and_then(|close| {
			let name = &after[..close];

			vars.iter().find(|(key, _)| *key == name).map(|(_, value)| (close, *value))
		});

		match replaced {
			Some((close, value)) => {
				out.push_str(value);

				rest = &after[close + 1..];
			},
			None => {
				out.push('{');

				rest = after;
			},
		}
	}

	out.push_str(rest);

	out
}

fn format_minutes(minutes: f64) -> String {
	if minutes.fract() == 0.0 { format!("{minutes:.0}") } else { format!("{minutes:.1}") }
}
