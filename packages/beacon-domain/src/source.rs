use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
	Gmail,
	Calendar,
	Drive,
}
impl Source {
	pub const ALL: [Self; 3] = [Self::Gmail, Self::Calendar, Self::Drive];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Gmail => "gmail",
			Self::Calendar => "calendar",
			Self::Drive => "drive",
		}
	}

	pub fn item_kind(self) -> ItemKind {
		match self {
			Self::Gmail => ItemKind::Email,
			Self::Calendar => ItemKind::Meeting,
			Self::Drive => ItemKind::Document,
		}
	}
}
impl fmt::Display for Source {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
impl FromStr for Source {
	type Err = UnknownSource;

	fn from_str(raw: &str) -> Result<Self, Self::Err> {
		match raw.trim().to_ascii_lowercase().as_str() {
			"gmail" => Ok(Self::Gmail),
			"calendar" => Ok(Self::Calendar),
			"drive" => Ok(Self::Drive),
			_ => Err(UnknownSource(raw.to_string())),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown source {0:?}; expected one of gmail, calendar, or drive.")]
pub struct UnknownSource(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
	Email,
	Meeting,
	Document,
}
impl ItemKind {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Email => "email",
			Self::Meeting => "meeting",
			Self::Document => "document",
		}
	}
}

/// One unit of fetched activity. `external_id` is stable per source and keys re-imports.
#[derive(Debug, Clone)]
pub struct RawActivityItem {
	pub external_id: String,
	pub source: Source,
	pub title: String,
	pub body: String,
	pub occurred_at: OffsetDateTime,
	pub ends_at: Option<OffsetDateTime>,
	pub participants: Vec<String>,
	pub labels: Vec<String>,
	/// True when the user authored the item (sent mail, organized meeting, owns the file).
	pub authored_by_user: bool,
	pub link: Option<String>,
}
impl RawActivityItem {
	pub fn kind(&self) -> ItemKind {
		self.source.item_kind()
	}

	/// Scheduled length in minutes, when the item has an explicit end.
	pub fn scheduled_minutes(&self) -> Option<f64> {
		let ends_at = self.ends_at?;
		let minutes = (ends_at - self.occurred_at).whole_seconds() as f64 / 60.0;

		(minutes > 0.0).then_some(minutes)
	}
}
