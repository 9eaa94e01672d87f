//! RFC 3339 timestamps and ISO 8601 calendar dates on the wire.

use serde::{Deserialize, Deserializer, Serializer};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

pub fn serialize<S>(value: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
	S: Serializer,
{
	let formatted = value.format(&Rfc3339).map_err(serde::ser::Error::custom)?;

	serializer.serialize_str(&formatted)
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
where
	D: Deserializer<'de>,
{
	let raw = String::deserialize(deserializer)?;

	OffsetDateTime::parse(&raw, &Rfc3339).map_err(serde::de::Error::custom)
}

pub mod option {
	use serde::{Deserialize as _, Deserializer, Serializer};
	use time::{OffsetDateTime, format_description::well_known::Rfc3339};

	pub fn serialize<S>(value: &Option<OffsetDateTime>, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		match value {
			Some(value) => super::serialize(value, serializer),
			None => serializer.serialize_none(),
		}
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<OffsetDateTime>, D::Error>
	where
		D: Deserializer<'de>,
	{
		Option::<String>::deserialize(deserializer)?
			.map(|raw| OffsetDateTime::parse(&raw, &Rfc3339).map_err(serde::de::Error::custom))
			.transpose()
	}
}

/// `YYYY-MM-DD`.
pub mod date {
	use serde::{Deserialize as _, Deserializer, Serializer};
	use time::{Date, macros::format_description};

	pub fn serialize<S>(value: &Date, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		let formatted = value
			.format(format_description!("[year]-[month]-[day]"))
			.map_err(serde::ser::Error::custom)?;

		serializer.serialize_str(&formatted)
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Date, D::Error>
	where
		D: Deserializer<'de>,
	{
		let raw = String::deserialize(deserializer)?;

		parse(&raw).map_err(serde::de::Error::custom)
	}

	pub fn parse(raw: &str) -> Result<Date, time::error::Parse> {
		Date::parse(raw.trim(), format_description!("[year]-[month]-[day]"))
	}

	pub mod option {
		use serde::{Deserialize as _, Deserializer, Serializer};
		use time::Date;

		pub fn serialize<S>(value: &Option<Date>, serializer: S) -> Result<S::Ok, S::Error>
		where
			S: Serializer,
		{
			match value {
				Some(value) => super::serialize(value, serializer),
				None => serializer.serialize_none(),
			}
		}

		pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Date>, D::Error>
		where
			D: Deserializer<'de>,
		{
			Option::<String>::deserialize(deserializer)?
				.map(|raw| super::parse(&raw).map_err(serde::de::Error::custom))
				.transpose()
		}
	}
}

#[cfg(test)]
mod tests {
	use time::macros::date;

	#[test]
	fn parses_calendar_dates() {
		assert_eq!(super::date::parse("2026-03-02").ok(), Some(date!(2026-03-02)));
		assert!(super::date::parse("03/02/2026").is_err());
		assert!(super::date::parse("2026-02-30").is_err());
	}
}
