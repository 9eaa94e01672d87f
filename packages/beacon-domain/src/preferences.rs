use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const MAX_CONFIDENCE_THRESHOLD: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptionLength {
	Short,
	Medium,
	Detailed,
}
impl DescriptionLength {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Short => "short",
			Self::Medium => "medium",
			Self::Detailed => "detailed",
		}
	}

	pub fn max_chars(self) -> usize {
		match self {
			Self::Short => 80,
			Self::Medium => 200,
			Self::Detailed => 500,
		}
	}
}
impl FromStr for DescriptionLength {
	type Err = PreferenceError;

	fn from_str(raw: &str) -> Result<Self, Self::Err> {
		match raw {
			"short" => Ok(Self::Short),
			"medium" => Ok(Self::Medium),
			"detailed" => Ok(Self::Detailed),
			other => Err(PreferenceError {
				field: "description_length",
				message: format!("description_length must be short, medium, or detailed, got {other:?}."),
			}),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Preferences {
	pub confidence_threshold: u8,
	pub auto_approve_enabled: bool,
	pub description_length: DescriptionLength,
	pub only_opened_emails: bool,
	pub skip_promotional: bool,
}
impl Default for Preferences {
	fn default() -> Self {
		Self {
			confidence_threshold: 70,
			auto_approve_enabled: false,
			description_length: DescriptionLength::Medium,
			only_opened_emails: false,
			skip_promotional: true,
		}
	}
}
impl Preferences {
	/// Returns the patched preferences, or the first invalid field. `self` is never modified, so
	/// a rejected patch leaves stored preferences untouched.
	pub fn apply(&self, patch: &PreferencesPatch) -> Result<Self, PreferenceError> {
		let mut next = self.clone();

		if let Some(threshold) = patch.confidence_threshold {
			if !(0..=MAX_CONFIDENCE_THRESHOLD).contains(&threshold) {
				return Err(PreferenceError {
					field: "confidence_threshold",
					message: format!(
						"confidence_threshold must be in the range 0-{MAX_CONFIDENCE_THRESHOLD}, got {threshold}."
					),
				});
			}

			next.confidence_threshold = threshold as u8;
		}
		if let Some(raw) = patch.description_length.as_deref() {
			next.description_length = raw.parse()?;
		}
		if let Some(value) = patch.auto_approve_enabled {
			next.auto_approve_enabled = value;
		}
		if let Some(value) = patch.only_opened_emails {
			next.only_opened_emails = value;
		}
		if let Some(value) = patch.skip_promotional {
			next.skip_promotional = value;
		}

		Ok(next)
	}

	/// True when a confidence in `[0, 1]` falls under the user's 0-100 threshold.
	pub fn is_low_confidence(&self, confidence_score: f64) -> bool {
		confidence_score * 100.0 < f64::from(self.confidence_threshold)
	}
}

/// Partial update. Numeric fields are wide so out-of-range input reaches validation instead of
/// failing deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreferencesPatch {
	pub confidence_threshold: Option<i64>,
	pub auto_approve_enabled: Option<bool>,
	pub description_length: Option<String>,
	pub only_opened_emails: Option<bool>,
	pub skip_promotional: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct PreferenceError {
	pub field: &'static str,
	pub message: String,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn rejects_threshold_above_range_without_changes() {
		let current = Preferences::default();
		let patch = PreferencesPatch {
			confidence_threshold: Some(150),
			skip_promotional: Some(false),
			..Default::default()
		};
		let err = current.apply(&patch).expect_err("Expected threshold rejection.");

		assert_eq!(err.field, "confidence_threshold");
		assert_eq!(current, Preferences::default());
	}

	#[test]
	fn rejects_negative_threshold() {
		let patch = PreferencesPatch { confidence_threshold: Some(-1), ..Default::default() };

		assert!(Preferences::default().apply(&patch).is_err());
	}

	#[test]
	fn applies_boundary_values() {
		let patch = PreferencesPatch {
			confidence_threshold: Some(100),
			description_length: Some("detailed".to_string()),
			auto_approve_enabled: Some(true),
			..Default::default()
		};
		let next = Preferences::default().apply(&patch).expect("Expected valid patch.");

		assert_eq!(next.confidence_threshold, 100);
		assert_eq!(next.description_length, DescriptionLength::Detailed);
		assert!(next.auto_approve_enabled);
		assert!(next.skip_promotional);
	}

	#[test]
	fn rejects_unknown_description_length() {
		let patch =
			PreferencesPatch { description_length: Some("verbose".to_string()), ..Default::default() };
		let err = Preferences::default().apply(&patch).expect_err("Expected rejection.");

		assert_eq!(err.field, "description_length");
	}

	#[test]
	fn low_confidence_compares_on_percent_scale() {
		let prefs = Preferences::default();

		assert!(prefs.is_low_confidence(0.69));
		assert!(!prefs.is_low_confidence(0.8));
	}
}
