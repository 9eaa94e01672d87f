use serde::Serialize;
use time::OffsetDateTime;

use crate::{BeaconService, Error, Result};
use beacon_domain::preferences::{DescriptionLength, Preferences, PreferencesPatch};
use beacon_storage::models::PreferencesRow;

#[derive(Debug, Clone, Serialize)]
pub struct PreferencesResponse {
	pub user_id: String,
	#[serde(flatten)]
	pub preferences: Preferences,
	/// `None` until the user saves preferences; defaults are returned until then.
	#[serde(with = "crate::time_serde::option")]
	pub updated_at: Option<OffsetDateTime>,
}

impl BeaconService {
	pub async fn get_preferences(&self, user_id: &str) -> Result<PreferencesResponse> {
		let user_id = require_user(user_id)?;
		let (preferences, updated_at) = load_preferences(self, user_id).await?;

		Ok(PreferencesResponse { user_id: user_id.to_string(), preferences, updated_at })
	}

	/// Applies `patch` over the current preferences. Nothing is written when any field fails
	/// validation.
	pub async fn update_preferences(
		&self,
		user_id: &str,
		patch: PreferencesPatch,
	) -> Result<PreferencesResponse> {
		let user_id = require_user(user_id)?;
		let (current, _) = load_preferences(self, user_id).await?;
		let next = current.apply(&patch)?;
		let updated_at = OffsetDateTime::now_utc();

		self.store
			.upsert_preferences(&PreferencesRow {
				user_id: user_id.to_string(),
				confidence_threshold: i16::from(next.confidence_threshold),
				auto_approve_enabled: next.auto_approve_enabled,
				description_length: next.description_length.as_str().to_string(),
				only_opened_emails: next.only_opened_emails,
				skip_promotional: next.skip_promotional,
				updated_at,
			})
			.await?;

		tracing::info!(user_id, "Preferences updated.");

		Ok(PreferencesResponse {
			user_id: user_id.to_string(),
			preferences: next,
			updated_at: Some(updated_at),
		})
	}
}

/// Stored preferences, or the defaults when the user has none yet.
pub(crate) async fn load_preferences(
	service: &BeaconService,
	user_id: &str,
) -> Result<(Preferences, Option<OffsetDateTime>)> {
	match service.store.get_preferences(user_id).await? {
		Some(row) => Ok((from_row(&row)?, Some(row.updated_at))),
		None => Ok((Preferences::default(), None)),
	}
}

fn from_row(row: &PreferencesRow) -> Result<Preferences> {
	let confidence_threshold = u8::try_from(row.confidence_threshold).map_err(|_| Error::Storage {
		message: format!("Stored confidence_threshold {} is out of range.", row.confidence_threshold),
	})?;
	let description_length = row
		.description_length
		.parse::<DescriptionLength>()
		.map_err(|err| Error::Storage { message: err.message })?;

	Ok(Preferences {
		confidence_threshold,
		auto_approve_enabled: row.auto_approve_enabled,
		description_length,
		only_opened_emails: row.only_opened_emails,
		skip_promotional: row.skip_promotional,
	})
}

fn require_user(user_id: &str) -> Result<&str> {
	let user_id = user_id.trim();

	if user_id.is_empty() {
		return Err(Error::field("user_id", "user_id must be non-empty."));
	}

	Ok(user_id)
}
