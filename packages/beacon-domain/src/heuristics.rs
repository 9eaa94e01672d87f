use unicode_segmentation::UnicodeSegmentation;

use crate::source::{ItemKind, RawActivityItem};

pub const READING_WORDS_PER_MINUTE: f64 = 200.0;
pub const WRITING_WORDS_PER_MINUTE: f64 = 40.0;
pub const DEFAULT_MEETING_MINUTES: f64 = 30.0;
pub const MIN_ACTIVITY_MINUTES: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
	pub min_minutes: f64,
	pub max_minutes: f64,
}

pub fn word_count(text: &str) -> usize {
	text.unicode_words().count()
}

/// Whole-minute baseline the model is asked to refine.
pub fn baseline_minutes(item: &RawActivityItem) -> f64 {
	let minutes = match item.kind() {
		ItemKind::Email => {
			let words = word_count(&item.title) + word_count(&item.body);
			let rate = if item.authored_by_user {
				WRITING_WORDS_PER_MINUTE
			} else {
				READING_WORDS_PER_MINUTE
			};

			words as f64 / rate
		},
		ItemKind::Meeting => item.scheduled_minutes().unwrap_or(DEFAULT_MEETING_MINUTES),
		ItemKind::Document => word_count(&item.body) as f64 / READING_WORDS_PER_MINUTE,
	};

	minutes.ceil().max(MIN_ACTIVITY_MINUTES)
}

/// Bounds stated to the model: half to three times the baseline, never above `cap`.
pub fn suggested_bounds(baseline: f64, cap: f64) -> Bounds {
	let cap = cap.max(MIN_ACTIVITY_MINUTES);
	let min_minutes = (baseline / 2.0).floor().max(MIN_ACTIVITY_MINUTES).min(cap);
	let max_minutes = (baseline * 3.0).ceil().clamp(min_minutes, cap);

	Bounds { min_minutes, max_minutes }
}

#[cfg(test)]
mod tests {
	use time::{Duration, macros::datetime};

	use super::*;
	use crate::source::Source;

	fn item(source: Source, body: &str) -> RawActivityItem {
		RawActivityItem {
			external_id: "x".to_string(),
			source,
			title: String::new(),
			body: body.to_string(),
			occurred_at: datetime!(2026-03-02 09:00 UTC),
			ends_at: None,
			participants: Vec::new(),
			labels: Vec::new(),
			authored_by_user: false,
			link: None,
		}
	}

	#[test]
	fn counts_words_not_punctuation() {
		assert_eq!(word_count("Hello, world! It's 9 a.m."), 5);
	}

	#[test]
	fn received_email_uses_reading_speed() {
		let body = vec!["word"; 400].join(" ");

		assert_eq!(baseline_minutes(&item(Source::Gmail, &body)), 2.0);
	}

	#[test]
	fn sent_email_uses_writing_speed() {
		let body = vec!["word"; 400].join(" ");
		let mut sent = item(Source::Gmail, &body);

		sent.authored_by_user = true;

		assert_eq!(baseline_minutes(&sent), 10.0);
	}

	#[test]
	fn meeting_uses_scheduled_length() {
		let mut meeting = item(Source::Calendar, "");

		meeting.ends_at = Some(meeting.occurred_at + Duration::minutes(45));

		assert_eq!(baseline_minutes(&meeting), 45.0);
		assert_eq!(baseline_minutes(&item(Source::Calendar, "")), DEFAULT_MEETING_MINUTES);
	}

	#[test]
	fn empty_content_floors_at_one_minute() {
		assert_eq!(baseline_minutes(&item(Source::Drive, "")), MIN_ACTIVITY_MINUTES);
	}

	#[test]
	fn bounds_respect_cap() {
		assert_eq!(suggested_bounds(10.0, 480.0), Bounds { min_minutes: 5.0, max_minutes: 30.0 });
		assert_eq!(
			suggested_bounds(300.0, 480.0),
			Bounds { min_minutes: 150.0, max_minutes: 480.0 }
		);
		assert_eq!(suggested_bounds(1.0, 480.0), Bounds { min_minutes: 1.0, max_minutes: 3.0 });
	}
}
