//! Gmail REST v1: list matching message ids, then read each message in full.

use base64::Engine;
use reqwest::Client;
use serde::Deserialize;
use time::OffsetDateTime;

use crate::{Error, FetchOutcome, Result, SourceQuery, retry::RetryPolicy};
use beacon_domain::source::{RawActivityItem, Source};

const SENT_LABEL: &str = "SENT";
const PARTICIPANT_HEADERS: [&str; 3] = ["From", "To", "Cc"];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageList {
	#[serde(default)]
	messages: Vec<MessageRef>,
	next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
	id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Message {
	id: String,
	#[serde(default)]
	label_ids: Vec<String>,
	#[serde(default)]
	snippet: String,
	internal_date: Option<String>,
	payload: Option<Part>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
	#[serde(default)]
	mime_type: String,
	#[serde(default)]
	headers: Vec<Header>,
	body: Option<PartBody>,
	#[serde(default)]
	parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Header {
	name: String,
	value: String,
}

#[derive(Debug, Deserialize)]
struct PartBody {
	data: Option<String>,
}

pub(crate) async fn fetch(
	client: &Client,
	policy: &RetryPolicy,
	api_base: &str,
	page_size: usize,
	token: &str,
	query: &SourceQuery,
) -> Result<FetchOutcome> {
	let ids = list_ids(client, policy, api_base, page_size, token, query).await?;
	let mut outcome = FetchOutcome::default();

	for id in ids {
		let url = format!("{api_base}/messages/{id}");
		let read = crate::get_json::<Message>(
			client,
			policy,
			token,
			&url,
			&[("format", "full".to_string())],
		)
		.await
		.and_then(to_item);

		match read {
			Ok(item) => outcome.items.push(item),
			Err(err) => crate::record_item_failure(&mut outcome, &id, err)?,
		}
	}

	Ok(outcome)
}

async fn list_ids(
	client: &Client,
	policy: &RetryPolicy,
	api_base: &str,
	page_size: usize,
	token: &str,
	query: &SourceQuery,
) -> Result<Vec<String>> {
	let url = format!("{api_base}/messages");
	let q = search_query(query);
	let mut ids = Vec::new();
	let mut page_token = None;

	while ids.len() < query.max_items {
		let remaining = query.max_items - ids.len();
		let mut params = vec![("q", q.clone()), ("maxResults", remaining.min(page_size).to_string())];

		if let Some(page_token) = page_token.take() {
			params.push(("pageToken", page_token));
		}

		let page: MessageList = crate::get_json(client, policy, token, &url, &params).await?;

		ids.extend(page.messages.into_iter().map(|message| message.id).take(remaining));

		match page.next_page_token {
			Some(next) => page_token = Some(next),
			None => break,
		}
	}

	Ok(ids)
}

/// Gmail search syntax for the import window and the user's mail preferences.
pub fn search_query(query: &SourceQuery) -> String {
	let mut terms =
		vec![format!("after:{}", query.start.unix_timestamp()), format!("before:{}", query.end.unix_timestamp())];

	if let Some(extra) = query.query.as_deref().map(str::trim).filter(|extra| !extra.is_empty()) {
		terms.push(format!("({extra})"));
	}
	if query.skip_promotional {
		terms.push("-category:promotions".to_string());
	}
	if query.only_opened_emails {
		terms.push("-is:unread".to_string());
	}

	terms.join(" ")
}

pub(crate) fn to_item(message: Message) -> Result<RawActivityItem> {
	let millis = message
		.internal_date
		.as_deref()
		.and_then(|raw| raw.parse::<i128>().ok())
		.ok_or_else(|| Error::InvalidResponse {
			message: format!("Message {} has no usable internalDate.", message.id),
		})?;
	let occurred_at = OffsetDateTime::from_unix_timestamp_nanos(millis * 1_000_000).map_err(|_| {
		Error::InvalidResponse { message: format!("Message {} has an out-of-range date.", message.id) }
	})?;
	let payload = message.payload.unwrap_or_default();
	let title = header(&payload, "Subject").unwrap_or_default().to_string();
	let body = plain_text(&payload).unwrap_or(message.snippet);
	let participants = PARTICIPANT_HEADERS
		.iter()
		.filter_map(|name| header(&payload, name))
		.flat_map(|value| value.split(','))
		.map(str::trim)
		.filter(|address| !address.is_empty())
		.map(str::to_string)
		.collect();
	let authored_by_user = message.label_ids.iter().any(|label| label == SENT_LABEL);

	Ok(RawActivityItem {
		link: Some(format!("https://mail.google.com/mail/u/0/#all/{}", message.id)),
		external_id: message.id,
		source: Source::Gmail,
		title,
		body,
		occurred_at,
		ends_at: None,
		participants,
		labels: message.label_ids,
		authored_by_user,
	})
}

fn header<'a>(part: &'a Part, name: &str) -> Option<&'a str> {
	part.headers
		.iter()
		.find(|header| header.name.eq_ignore_ascii_case(name))
		.map(|header| header.value.as_str())
}

/// First `text/plain` part, depth first.
fn plain_text(part: &Part) -> Option<String> {
	if part.mime_type == "text/plain"
		&& let Some(data) = part.body.as_ref().and_then(|body| body.data.as_deref())
	{
		return decode_body(data);
	}

	part.parts.iter().find_map(plain_text)
}

fn decode_body(data: &str) -> Option<String> {
	let bytes =
		base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(data.trim_end_matches('=')).ok()?;

	String::from_utf8(bytes).ok()
}

#[cfg(test)]
mod tests {
	use serde_json::json;
	use time::macros::datetime;

	use super::*;

	fn query() -> SourceQuery {
		SourceQuery {
			start: datetime!(2026-03-01 00:00 UTC),
			end: datetime!(2026-03-08 00:00 UTC),
			max_items: 50,
			query: None,
			calendar_id: None,
			folder_id: None,
			only_opened_emails: false,
			skip_promotional: true,
		}
	}

	#[test]
	fn search_query_follows_preferences() {
		assert_eq!(search_query(&query()), "after:1772323200 before:1772928000 -category:promotions");

		let mut custom = query();

		custom.skip_promotional = false;
		custom.only_opened_emails = true;
		custom.query = Some("from:boss@example.com".to_string());

		assert_eq!(
			search_query(&custom),
			"after:1772323200 before:1772928000 (from:boss@example.com) -is:unread"
		);
	}

	#[test]
	fn reads_nested_plain_text_and_headers() {
		let message: Message = serde_json::from_value(json!({
			"id": "18c0",
			"labelIds": ["SENT", "INBOX"],
			"snippet": "fallback",
			"internalDate": "1772442000000",
			"payload": {
				"mimeType": "multipart/alternative",
				"headers": [
					{ "name": "Subject", "value": "Budget" },
					{ "name": "From", "value": "me@example.com" },
					{ "name": "To", "value": "a@example.com, b@example.com" }
				],
				"parts": [
					{ "mimeType": "text/html", "body": { "data": "PGI-aGk8L2I-" } },
					{ "mimeType": "text/plain", "body": { "data": "SGVsbG8gdGVhbQ" } }
				]
			}
		}))
		.expect("Failed to decode message.");
		let item = to_item(message).expect("Expected item.");

		assert_eq!(item.title, "Budget");
		assert_eq!(item.body, "Hello team");
		assert!(item.authored_by_user);
		assert_eq!(item.participants.len(), 3);
		assert_eq!(item.occurred_at, datetime!(2026-03-02 09:00 UTC));
	}

	#[test]
	fn falls_back_to_snippet_without_plain_text() {
		let message: Message = serde_json::from_value(json!({
			"id": "18c1",
			"snippet": "Short preview",
			"internalDate": "1772442000000"
		}))
		.expect("Failed to decode message.");
		let item = to_item(message).expect("Expected item.");

		assert_eq!(item.body, "Short preview");
		assert!(!item.authored_by_user);
	}

	#[test]
	fn rejects_message_without_date() {
		let message: Message =
			serde_json::from_value(json!({ "id": "18c2" })).expect("Failed to decode message.");

		assert!(to_item(message).is_err());
	}
}
