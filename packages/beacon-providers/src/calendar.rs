//! Google Calendar v3 events, expanded to single instances.

use reqwest::{Client, Url};
use serde::Deserialize;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::{Error, FetchOutcome, Result, SourceQuery, retry::RetryPolicy};
use beacon_domain::source::{RawActivityItem, Source};

const DEFAULT_CALENDAR_ID: &str = "primary";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventList {
	#[serde(default)]
	items: Vec<Event>,
	next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Event {
	id: String,
	#[serde(default)]
	status: String,
	summary: Option<String>,
	description: Option<String>,
	start: Option<EventTime>,
	end: Option<EventTime>,
	#[serde(default)]
	attendees: Vec<Attendee>,
	organizer: Option<Organizer>,
	html_link: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventTime {
	date_time: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Attendee {
	email: Option<String>,
	#[serde(rename = "self", default)]
	is_self: bool,
	response_status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Organizer {
	#[serde(rename = "self", default)]
	is_self: bool,
}

pub(crate) async fn fetch(
	client: &Client,
	policy: &RetryPolicy,
	api_base: &str,
	page_size: usize,
	token: &str,
	query: &SourceQuery,
) -> Result<FetchOutcome> {
	let calendar_id = query.calendar_id.as_deref().unwrap_or(DEFAULT_CALENDAR_ID);
	let url = events_url(api_base, calendar_id)?;
	let time_min = query.start.format(&Rfc3339)?;
	let time_max = query.end.format(&Rfc3339)?;
	let mut outcome = FetchOutcome::default();
	let mut page_token = None;
	let mut listed = 0;

	while listed < query.max_items {
		let remaining = query.max_items - listed;
		let mut params = vec![
			("timeMin", time_min.clone()),
			("timeMax", time_max.clone()),
			("singleEvents", "true".to_string()),
			("orderBy", "startTime".to_string()),
			("maxResults", remaining.min(page_size).to_string()),
		];

		if let Some(q) = query.query.as_deref().filter(|q| !q.trim().is_empty()) {
			params.push(("q", q.to_string()));
		}
		if let Some(page_token) = page_token.take() {
			params.push(("pageToken", page_token));
		}

		let page: EventList = crate::get_json(client, policy, token, url.as_str(), &params).await?;

		for event in page.items.into_iter().take(remaining) {
			listed += 1;

			let id = event.id.clone();

			match to_item(event) {
				Ok(Some(item)) => outcome.items.push(item),
				Ok(None) => tracing::debug!(event_id = %id, "Skipping event without tracked time."),
				Err(err) => crate::record_item_failure(&mut outcome, &id, err)?,
			}
		}

		match page.next_page_token {
			Some(next) => page_token = Some(next),
			None => break,
		}
	}

	Ok(outcome)
}

fn events_url(api_base: &str, calendar_id: &str) -> Result<Url> {
	let mut url = Url::parse(api_base)
		.map_err(|err| Error::InvalidConfig { message: format!("Invalid calendar_api_base: {err}.") })?;

	url.path_segments_mut()
		.map_err(|_| Error::InvalidConfig {
			message: "calendar_api_base cannot carry a path.".to_string(),
		})?
		.extend(["calendars", calendar_id, "events"]);

	Ok(url)
}

/// `None` for events that carry no billable time: cancelled, declined, or all-day.
pub(crate) fn to_item(event: Event) -> Result<Option<RawActivityItem>> {
	if event.status == "cancelled" {
		return Ok(None);
	}

	let declined = event.attendees.iter().any(|attendee| {
		attendee.is_self && attendee.response_status.as_deref() == Some("declined")
	});

	if declined {
		return Ok(None);
	}

	let (Some(start), Some(end)) = (
		event.start.and_then(|time| time.date_time),
		event.end.and_then(|time| time.date_time),
	) else {
		return Ok(None);
	};
	let occurred_at = parse_time(&event.id, &start)?;
	let ends_at = parse_time(&event.id, &end)?;
	let authored_by_user = event.organizer.is_some_and(|organizer| organizer.is_self);
	let participants = event.attendees.into_iter().filter_map(|attendee| attendee.email).collect();

	Ok(Some(RawActivityItem {
		external_id: event.id,
		source: Source::Calendar,
		title: event.summary.unwrap_or_default(),
		body: event.description.unwrap_or_default(),
		occurred_at,
		ends_at: Some(ends_at),
		participants,
		labels: Vec::new(),
		authored_by_user,
		link: event.html_link,
	}))
}

fn parse_time(event_id: &str, raw: &str) -> Result<OffsetDateTime> {
	OffsetDateTime::parse(raw, &Rfc3339).map_err(|err| Error::InvalidResponse {
		message: format!("Event {event_id} has an invalid time {raw:?}: {err}."),
	})
}
