use serde::{Deserialize, Serialize};
use time::{Date, Duration, OffsetDateTime};
use uuid::Uuid;

use crate::{
	estimate::DurationEstimate,
	preferences::{DescriptionLength, Preferences},
	source::{RawActivityItem, Source},
	truncate::truncate_chars,
};

pub const TAG_LOW_CONFIDENCE: &str = "low_confidence";
pub const TAG_AUTO_APPROVE_ELIGIBLE: &str = "auto_approve_eligible";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
	PendingReview,
	Approved,
	Rejected,
}
impl EntryStatus {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::PendingReview => "pending_review",
			Self::Approved => "approved",
			Self::Rejected => "rejected",
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchedProject {
	pub project_id: Uuid,
	pub name: String,
	pub client_name: Option<String>,
	pub client_is_internal: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeEntryDraft {
	pub user_id: String,
	pub company_id: String,
	pub date: Date,
	pub start_time: OffsetDateTime,
	pub end_time: OffsetDateTime,
	pub duration_hours: f64,
	pub project_id: Option<Uuid>,
	pub project: Option<String>,
	pub client: Option<String>,
	pub description: String,
	pub status: EntryStatus,
	pub source: Source,
	pub external_item_id: String,
	pub billable: bool,
	pub automated: bool,
	pub tags: Vec<String>,
	pub confidence_score: f64,
}

pub struct DraftArgs<'a> {
	pub user_id: &'a str,
	pub company_id: &'a str,
	pub item: &'a RawActivityItem,
	pub estimate: &'a DurationEstimate,
	pub project: Option<&'a MatchedProject>,
	pub summary: Option<&'a str>,
	pub preferences: &'a Preferences,
}

/// Shapes one item and its estimate into a reviewable entry. Automated entries always start as
/// `pending_review`; approval is a separate user action.
pub fn draft_entry(args: DraftArgs<'_>) -> TimeEntryDraft {
	let DraftArgs { user_id, company_id, item, estimate, project, summary, preferences } = args;
	let start_time = item.occurred_at;
	let end_time = start_time + Duration::seconds((estimate.estimated_minutes * 60.0).round() as i64);
	let mut tags = vec![item.source.as_str().to_string(), item.kind().as_str().to_string()];

	if preferences.is_low_confidence(estimate.confidence_score) {
		tags.push(TAG_LOW_CONFIDENCE.to_string());
	} else if preferences.auto_approve_enabled {
		tags.push(TAG_AUTO_APPROVE_ELIGIBLE.to_string());
	}

	TimeEntryDraft {
		user_id: user_id.to_string(),
		company_id: company_id.to_string(),
		date: start_time.date(),
		start_time,
		end_time,
		duration_hours: minutes_to_hours(estimate.estimated_minutes),
		project_id: project.map(|project| project.project_id),
		project: project.map(|project| project.name.clone()),
		client: project.and_then(|project| project.client_name.clone()),
		description: describe(item, estimate, summary, preferences.description_length),
		status: EntryStatus::PendingReview,
		source: item.source,
		external_item_id: item.external_id.clone(),
		billable: project.map(|project| !project.client_is_internal).unwrap_or(false),
		automated: true,
		tags,
		confidence_score: estimate.confidence_score,
	}
}

/// Hours rounded to two decimals.
pub fn minutes_to_hours(minutes: f64) -> f64 {
	(minutes / 60.0 * 100.0).round() / 100.0
}

fn describe(
	item: &RawActivityItem,
	estimate: &DurationEstimate,
	summary: Option<&str>,
	length: DescriptionLength,
) -> String {
	let title = item.title.trim();
	let title = if title.is_empty() { "(untitled)" } else { title };
	let reasoning = estimate.reasoning.trim();
	let full = match (length, summary) {
		(DescriptionLength::Short, _) => title.to_string(),
		(DescriptionLength::Detailed, Some(summary)) if !summary.trim().is_empty() =>
			format!("{title}: {}", summary.trim()),
		_ if reasoning.is_empty() => title.to_string(),
		_ => format!("{title}: {reasoning}"),
	};

	truncate_chars(&full, length.max_chars()).to_string()
}

#[cfg(test)]
mod tests {
	use time::macros::{date, datetime};

	use super::*;

	fn email() -> RawActivityItem {
		RawActivityItem {
			external_id: "msg-1".to_string(),
			source: Source::Gmail,
			title: "Quarterly report review".to_string(),
			body: "Please review the attached report.".to_string(),
			occurred_at: datetime!(2026-03-02 23:50 UTC),
			ends_at: None,
			participants: vec!["alice@example.com".to_string()],
			labels: Vec::new(),
			authored_by_user: false,
			link: None,
		}
	}

	fn estimate(minutes: f64, confidence: f64) -> DurationEstimate {
		DurationEstimate {
			estimated_minutes: minutes,
			confidence_score: confidence,
			reasoning: "Read and replied to a short request.".to_string(),
			min_minutes: 1.0,
			max_minutes: 60.0,
		}
	}

	fn draft(
		estimate: &DurationEstimate,
		project: Option<&MatchedProject>,
		preferences: &Preferences,
	) -> TimeEntryDraft {
		draft_entry(DraftArgs {
			user_id: "u1",
			company_id: "c1",
			item: &email(),
			estimate,
			project,
			summary: None,
			preferences,
		})
	}

	#[test]
	fn drafts_pending_review_automated_entry() {
		let entry = draft(&estimate(20.0, 0.9), None, &Preferences::default());

		assert_eq!(entry.status, EntryStatus::PendingReview);
		assert!(entry.automated);
		assert_eq!(entry.date, date!(2026-03-02));
		assert_eq!(entry.end_time, datetime!(2026-03-03 00:10 UTC));
		assert_eq!(entry.duration_hours, 0.33);
		assert_eq!(entry.external_item_id, "msg-1");
		assert_eq!(entry.tags, vec!["gmail".to_string(), "email".to_string()]);
	}

	#[test]
	fn billable_follows_client_internality() {
		let external = MatchedProject {
			project_id: Uuid::nil(),
			name: "Website".to_string(),
			client_name: Some("Acme".to_string()),
			client_is_internal: false,
		};
		let internal = MatchedProject { client_is_internal: true, ..external.clone() };
		let prefs = Preferences::default();

		assert!(draft(&estimate(20.0, 0.9), Some(&external), &prefs).billable);
		assert!(!draft(&estimate(20.0, 0.9), Some(&internal), &prefs).billable);
		assert!(!draft(&estimate(20.0, 0.9), None, &prefs).billable);
		assert_eq!(
			draft(&estimate(20.0, 0.9), Some(&external), &prefs).client.as_deref(),
			Some("Acme")
		);
	}

	#[test]
	fn tags_low_confidence_and_auto_approve_candidates() {
		let prefs = Preferences { auto_approve_enabled: true, ..Preferences::default() };
		let low = draft(&estimate(20.0, 0.4), None, &prefs);
		let high = draft(&estimate(20.0, 0.95), None, &prefs);

		assert!(low.tags.iter().any(|tag| tag == TAG_LOW_CONFIDENCE));
		assert!(!low.tags.iter().any(|tag| tag == TAG_AUTO_APPROVE_ELIGIBLE));
		assert!(high.tags.iter().any(|tag| tag == TAG_AUTO_APPROVE_ELIGIBLE));
	}

	#[test]
	fn description_respects_length_preference() {
		let short = Preferences {
			description_length: DescriptionLength::Short,
			..Preferences::default()
		};
		let medium = Preferences::default();

		assert_eq!(draft(&estimate(5.0, 0.9), None, &short).description, "Quarterly report review");
		assert_eq!(
			draft(&estimate(5.0, 0.9), None, &medium).description,
			"Quarterly report review: Read and replied to a short request."
		);
	}
}
