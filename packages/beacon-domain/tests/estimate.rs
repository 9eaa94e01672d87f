use serde_json::json;

use beacon_domain::{
	estimate::{self, MAX_ALTERNATIVES},
	heuristics,
	prompt::{self, PromptInput, PromptKind, TEMPLATES},
	source::ItemKind,
	truncate,
};

fn valid_duration() -> serde_json::Value {
	json!({
		"estimated_minutes": 12,
		"confidence_score": 0.8,
		"reasoning": "Short reply to a scheduling request.",
		"min_minutes": 5,
		"max_minutes": 20
	})
}

#[test]
fn accepts_well_formed_duration() {
	let parsed = estimate::parse_duration(&valid_duration(), 480.0).expect("Expected valid answer.");

	assert_eq!(parsed.estimated_minutes, 12.0);
	assert_eq!(parsed.confidence_score, 0.8);
}

#[test]
fn rejects_confidence_outside_unit_interval_instead_of_clamping() {
	for score in [1.2, -0.1] {
		let mut answer = valid_duration();

		answer["confidence_score"] = json!(score);

		let err = estimate::parse_duration(&answer, 480.0).expect_err("Expected rejection.");

		assert!(err.message.contains("confidence_score"), "{}", err.message);
	}
}

#[test]
fn accepts_confidence_at_interval_edges() {
	for score in [0.0, 1.0] {
		let mut answer = valid_duration();

		answer["confidence_score"] = json!(score);

		assert!(estimate::parse_duration(&answer, 480.0).is_ok());
	}
}

#[test]
fn rejects_missing_confidence_instead_of_defaulting() {
	let mut answer = valid_duration();

	answer.as_object_mut().expect("Expected object.").remove("confidence_score");

	let err = estimate::parse_duration(&answer, 480.0).expect_err("Expected rejection.");

	assert_eq!(err.message, "Model answer is missing confidence_score.");
}

#[test]
fn rejects_negative_minutes() {
	let mut answer = valid_duration();

	answer["min_minutes"] = json!(-5);

	assert!(estimate::parse_duration(&answer, 480.0).is_err());
}

#[test]
fn rejects_estimate_outside_its_own_bounds() {
	let mut answer = valid_duration();

	answer["estimated_minutes"] = json!(25);

	assert!(estimate::parse_duration(&answer, 480.0).is_err());

	answer["min_minutes"] = json!(30);

	assert!(estimate::parse_duration(&answer, 480.0).is_err());
}

#[test]
fn rejects_estimate_above_cap() {
	let answer = json!({
		"estimated_minutes": 600,
		"confidence_score": 0.5,
		"reasoning": "All-day workshop.",
		"min_minutes": 500,
		"max_minutes": 700
	});

	assert!(estimate::parse_duration(&answer, 480.0).is_err());
}

#[test]
fn rejects_non_object_answers() {
	assert!(estimate::parse_duration(&json!([1, 2, 3]), 480.0).is_err());
	assert!(estimate::parse_duration(&json!("12 minutes"), 480.0).is_err());
}

#[test]
fn project_match_accepts_null_and_known_ids() {
	let known = ["p-1", "p-2"];
	let answer = json!({
		"project_id": null,
		"confidence_score": 0.3,
		"reasoning": "No project keywords present.",
		"alternatives": [{ "project_id": "p-2", "confidence_score": 0.2 }]
	});
	let parsed = estimate::parse_project_match(&answer, &known).expect("Expected valid match.");

	assert_eq!(parsed.project_id, None);
	assert_eq!(parsed.alternatives.len(), 1);
}

#[test]
fn project_match_rejects_unknown_ids_and_long_alternative_lists() {
	let known = ["p-1", "p-2"];
	let unknown = json!({
		"project_id": "p-9",
		"confidence_score": 0.9,
		"reasoning": "Invented.",
		"alternatives": []
	});

	assert!(estimate::parse_project_match(&unknown, &known).is_err());

	let alternatives = vec![json!({ "project_id": "p-1", "confidence_score": 0.1 }); MAX_ALTERNATIVES + 1];
	let too_many = json!({
		"project_id": "p-1",
		"confidence_score": 0.9,
		"reasoning": "Keyword match.",
		"alternatives": alternatives
	});

	assert!(estimate::parse_project_match(&too_many, &known).is_err());
}

#[test]
fn summary_requires_every_field() {
	let answer = json!({ "summary": "Reviewed the Q3 report.", "key_points": ["budget"] });

	assert!(estimate::parse_summary(&answer).is_err());

	let answer = json!({
		"summary": "Reviewed the Q3 report.",
		"key_points": ["budget"],
		"category": "review"
	});

	assert_eq!(estimate::parse_summary(&answer).expect("Expected summary.").category, "review");
}

#[test]
fn truncation_budgets_are_exact() {
	let expected = [
		(PromptKind::EmailAnalysis, 2_000),
		(PromptKind::DurationEstimate, 1_500),
		(PromptKind::ProjectMatch, 1_000),
		(PromptKind::Summary, 1_000),
		(PromptKind::MeetingAnalysis, 800),
		(PromptKind::DocumentAnalysis, 500),
	];

	for (kind, limit) in expected {
		let template = prompt::template(kind);

		assert_eq!(template.max_content_chars, limit, "{}", kind.as_str());

		let content = "x".repeat(limit + 37);
		let rendered = prompt::render(template, &PromptInput { content: &content, ..Default::default() });
		let sent = "x".repeat(limit);

		assert!(rendered.user_instruction.ends_with(&format!("\n{sent}")));
		assert!(!rendered.user_instruction.contains(&"x".repeat(limit + 1)));
		assert_eq!(truncate::truncate_chars(&content, limit).chars().count(), limit);
	}
}

#[test]
fn content_at_limit_is_sent_whole() {
	let template = prompt::template(PromptKind::MeetingAnalysis);
	let content = "y".repeat(800);
	let rendered = prompt::render(template, &PromptInput { content: &content, ..Default::default() });

	assert!(rendered.user_instruction.ends_with(&content));
}

#[test]
fn rendered_prompts_carry_rules_bounds_and_schema() {
	let template = prompt::template(PromptKind::for_item_kind(ItemKind::Email));
	let bounds = heuristics::suggested_bounds(6.0, 480.0);
	let rendered = prompt::render(
		template,
		&PromptInput {
			context: "Subject: Invoice {draft}",
			content: "Body",
			baseline_minutes: Some(6.0),
			min_minutes: Some(bounds.min_minutes),
			max_minutes: Some(bounds.max_minutes),
			projects_json: None,
		},
	);

	assert!(rendered.system_instruction.starts_with(prompt::BASE_RULES));
	assert!(rendered.system_instruction.contains("JSON object only"));
	assert!(rendered.user_instruction.contains("between 3 and 18 minutes"));
	assert!(rendered.user_instruction.contains("\"estimated_minutes\""));
	assert!(rendered.user_instruction.contains("Subject: Invoice {draft}"));
}

#[test]
fn every_template_is_addressable_by_kind() {
	assert_eq!(TEMPLATES.len(), 6);
	assert_eq!(PromptKind::for_item_kind(ItemKind::Document), PromptKind::DocumentAnalysis);
	assert_eq!(PromptKind::for_item_kind(ItemKind::Meeting), PromptKind::MeetingAnalysis);
}
