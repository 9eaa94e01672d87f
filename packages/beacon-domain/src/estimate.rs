//! Strict validation of model answers.
//!
//! Every check fails the answer outright. Values are never clamped and missing fields are never
//! defaulted; a partially valid answer is an invalid answer.

use serde::Serialize;
use serde_json::{Map, Value};

pub const MAX_ALTERNATIVES: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct InvalidResponse {
	pub message: String,
}
impl InvalidResponse {
	fn new(message: impl Into<String>) -> Self {
		Self { message: message.into() }
	}
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DurationEstimate {
	pub estimated_minutes: f64,
	pub confidence_score: f64,
	pub reasoning: String,
	pub min_minutes: f64,
	pub max_minutes: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectMatch {
	pub project_id: Option<String>,
	pub confidence_score: f64,
	pub reasoning: String,
	pub alternatives: Vec<ProjectAlternative>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectAlternative {
	pub project_id: String,
	pub confidence_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
	pub summary: String,
	pub key_points: Vec<String>,
	pub category: String,
}

/// Validates a duration answer. `cap` is the per-item ceiling in minutes.
pub fn parse_duration(value: &Value, cap: f64) -> Result<DurationEstimate, InvalidResponse> {
	let object = as_object(value)?;
	let estimated_minutes = minutes_field(object, "estimated_minutes")?;
	let confidence_score = confidence_field(object, "confidence_score")?;
	let reasoning = string_field(object, "reasoning")?;
	let min_minutes = minutes_field(object, "min_minutes")?;
	let max_minutes = minutes_field(object, "max_minutes")?;

	if min_minutes > max_minutes {
		return Err(InvalidResponse::new(format!(
			"min_minutes {min_minutes} exceeds max_minutes {max_minutes}."
		)));
	}
	if estimated_minutes < min_minutes || estimated_minutes > max_minutes {
		return Err(InvalidResponse::new(format!(
			"estimated_minutes {estimated_minutes} is outside [{min_minutes}, {max_minutes}]."
		)));
	}
	if estimated_minutes > cap {
		return Err(InvalidResponse::new(format!(
			"estimated_minutes {estimated_minutes} exceeds the per-item cap of {cap}."
		)));
	}

	Ok(DurationEstimate { estimated_minutes, confidence_score, reasoning, min_minutes, max_minutes })
}

/// Validates a project match answer against the ids the model was offered.
pub fn parse_project_match(
	value: &Value,
	known_ids: &[&str],
) -> Result<ProjectMatch, InvalidResponse> {
	let object = as_object(value)?;
	let project_id = match required(object, "project_id")? {
		Value::Null => None,
		Value::String(id) => Some(known_id(id, known_ids)?),
		_ => return Err(InvalidResponse::new("project_id must be a string or null.")),
	};
	let confidence_score = confidence_field(object, "confidence_score")?;
	let reasoning = string_field(object, "reasoning")?;
	let Value::Array(raw_alternatives) = required(object, "alternatives")? else {
		return Err(InvalidResponse::new("alternatives must be an array."));
	};

	if raw_alternatives.len() > MAX_ALTERNATIVES {
		return Err(InvalidResponse::new(format!(
			"alternatives has {} entries; at most {MAX_ALTERNATIVES} are allowed.",
			raw_alternatives.len()
		)));
	}

	let mut alternatives = Vec::with_capacity(raw_alternatives.len());

	for raw in raw_alternatives {
		let object = as_object(raw)?;
		let id = string_field(object, "project_id")?;

		alternatives.push(ProjectAlternative {
			project_id: known_id(&id, known_ids)?,
			confidence_score: confidence_field(object, "confidence_score")?,
		});
	}

	Ok(ProjectMatch { project_id, confidence_score, reasoning, alternatives })
}

pub fn parse_summary(value: &Value) -> Result<Summary, InvalidResponse> {
	let object = as_object(value)?;
	let summary = string_field(object, "summary")?;

	if summary.trim().is_empty() {
		return Err(InvalidResponse::new("summary must not be empty."));
	}

	let Value::Array(raw_points) = required(object, "key_points")? else {
		return Err(InvalidResponse::new("key_points must be an array."));
	};
	let mut key_points = Vec::with_capacity(raw_points.len());

	for point in raw_points {
		let Value::String(point) = point else {
			return Err(InvalidResponse::new("key_points entries must be strings."));
		};

		key_points.push(point.clone());
	}

	let category = string_field(object, "category")?;

	Ok(Summary { summary, key_points, category })
}

fn as_object(value: &Value) -> Result<&Map<String, Value>, InvalidResponse> {
	value.as_object().ok_or_else(|| InvalidResponse::new("Model answer must be a JSON object."))
}

fn required<'a>(object: &'a Map<String, Value>, field: &str) -> Result<&'a Value, InvalidResponse> {
	object
		.get(field)
		.ok_or_else(|| InvalidResponse::new(format!("Model answer is missing {field}.")))
}

fn string_field(object: &Map<String, Value>, field: &str) -> Result<String, InvalidResponse> {
	required(object, field)?
		.as_str()
		.map(str::to_string)
		.ok_or_else(|| InvalidResponse::new(format!("{field} must be a string.")))
}

fn number_field(object: &Map<String, Value>, field: &str) -> Result<f64, InvalidResponse> {
	let number = required(object, field)?
		.as_f64()
		.ok_or_else(|| InvalidResponse::new(format!("{field} must be a number.")))?;

	if !number.is_finite() {
		return Err(InvalidResponse::new(format!("{field} must be finite.")));
	}

	Ok(number)
}

fn minutes_field(object: &Map<String, Value>, field: &str) -> Result<f64, InvalidResponse> {
	let minutes = number_field(object, field)?;

	if minutes < 0.0 {
		return Err(InvalidResponse::new(format!("{field} must not be negative, got {minutes}.")));
	}

	Ok(minutes)
}

fn confidence_field(object: &Map<String, Value>, field: &str) -> Result<f64, InvalidResponse> {
	let score = number_field(object, field)?;

	if !(0.0..=1.0).contains(&score) {
		return Err(InvalidResponse::new(format!("{field} must be within [0, 1], got {score}.")));
	}

	Ok(score)
}

fn known_id(id: &str, known_ids: &[&str]) -> Result<String, InvalidResponse> {
	if known_ids.contains(&id) {
		Ok(id.to_string())
	} else {
		Err(InvalidResponse::new(format!("project_id {id:?} is not one of the offered projects.")))
	}
}
