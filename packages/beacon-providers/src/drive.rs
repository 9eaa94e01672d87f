//! Google Drive v3 files modified inside the import window.

use reqwest::Client;
use serde::Deserialize;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::{Error, FetchOutcome, Result, SourceQuery, retry::RetryPolicy};
use beacon_domain::source::{RawActivityItem, Source};

const GOOGLE_DOC_MIME: &str = "application/vnd.google-apps.document";
const FILE_FIELDS: &str = "nextPageToken,files(id,name,mimeType,description,modifiedTime,webViewLink,owners(emailAddress,me),lastModifyingUser(emailAddress,me))";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
	#[serde(default)]
	files: Vec<File>,
	next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct File {
	id: String,
	#[serde(default)]
	name: String,
	#[serde(default)]
	mime_type: String,
	description: Option<String>,
	modified_time: Option<String>,
	web_view_link: Option<String>,
	#[serde(default)]
	owners: Vec<User>,
	last_modifying_user: Option<User>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct User {
	email_address: Option<String>,
	#[serde(default)]
	me: bool,
}

pub(crate) async fn fetch(
	client: &Client,
	policy: &RetryPolicy,
	api_base: &str,
	page_size: usize,
	token: &str,
	query: &SourceQuery,
) -> Result<FetchOutcome> {
	let url = format!("{api_base}/files");
	let q = search_query(query)?;
	let mut outcome = FetchOutcome::default();
	let mut page_token = None;
	let mut listed = 0;

	while listed < query.max_items {
		let remaining = query.max_items - listed;
		let mut params = vec![
			("q", q.clone()),
			("fields", FILE_FIELDS.to_string()),
			("orderBy", "modifiedTime desc".to_string()),
			("pageSize", remaining.min(page_size).to_string()),
		];

		if let Some(page_token) = page_token.take() {
			params.push(("pageToken", page_token));
		}

		let page: FileList = crate::get_json(client, policy, token, &url, &params).await?;

		for file in page.files.into_iter().take(remaining) {
			listed += 1;

			let id = file.id.clone();
			let text = if file.mime_type == GOOGLE_DOC_MIME {
				export_text(client, policy, api_base, token, &id).await
			} else {
				Ok(None)
			};

			match text.and_then(|text| to_item(file, text)) {
				Ok(item) => outcome.items.push(item),
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

/// Drive query language for the window, an optional folder, and an optional name filter.
pub fn search_query(query: &SourceQuery) -> Result<String> {
	let mut clauses = vec![
		format!("modifiedTime >= '{}'", query.start.format(&Rfc3339)?),
		format!("modifiedTime < '{}'", query.end.format(&Rfc3339)?),
		"trashed = false".to_string(),
		"mimeType != 'application/vnd.google-apps.folder'".to_string(),
	];

	if let Some(folder_id) = query.folder_id.as_deref().filter(|id| !id.trim().is_empty()) {
		clauses.push(format!("'{}' in parents", escape(folder_id.trim())));
	}
	if let Some(name) = query.query.as_deref().map(str::trim).filter(|name| !name.is_empty()) {
		clauses.push(format!("name contains '{}'", escape(name)));
	}

	Ok(clauses.join(" and "))
}

async fn export_text(
	client: &Client,
	policy: &RetryPolicy,
	api_base: &str,
	token: &str,
	file_id: &str,
) -> Result<Option<String>> {
	let url = format!("{api_base}/files/{file_id}/export");
	let text =
		crate::get_text(client, policy, token, &url, &[("mimeType", "text/plain".to_string())])
			.await?;

	Ok(Some(text))
}

pub(crate) fn to_item(file: File, text: Option<String>) -> Result<RawActivityItem> {
	let modified = file.modified_time.as_deref().ok_or_else(|| Error::InvalidResponse {
		message: format!("File {} has no modifiedTime.", file.id),
	})?;
	let occurred_at = OffsetDateTime::parse(modified, &Rfc3339).map_err(|err| {
		Error::InvalidResponse {
			message: format!("File {} has an invalid modifiedTime {modified:?}: {err}.", file.id),
		}
	})?;
	let authored_by_user = file.owners.iter().any(|owner| owner.me)
		|| file.last_modifying_user.as_ref().is_some_and(|user| user.me);
	let body = text.or(file.description).unwrap_or_default();
	let participants = file.owners.into_iter().filter_map(|owner| owner.email_address).collect();

	Ok(RawActivityItem {
		external_id: file.id,
		source: Source::Drive,
		title: file.name,
		body,
		occurred_at,
		ends_at: None,
		participants,
		labels: vec![file.mime_type],
		authored_by_user,
		link: file.web_view_link,
	})
}

fn escape(value: &str) -> String {
	value.replace('\\', "\\\\").replace('\'', "\\'")
}

#[cfg(test)]
mod tests {
	use serde_json::json;
	use time::macros::datetime;

	use super::*;

	fn query() -> SourceQuery {
		SourceQuery {
			start: datetime!(2026-03-01 00:00 UTC),
			end: datetime!(2026-03-02 00:00 UTC),
			max_items: 10,
			query: Some("O'Brien plan".to_string()),
			calendar_id: None,
			folder_id: Some("folder-1".to_string()),
			only_opened_emails: false,
			skip_promotional: true,
		}
	}

	#[test]
	fn builds_window_folder_and_name_clauses() {
		let q = search_query(&query()).expect("Expected query.");

		assert!(q.starts_with("modifiedTime >= '2026-03-01T00:00:00Z' and modifiedTime < '2026-03-02T00:00:00Z'"));
		assert!(q.contains("'folder-1' in parents"));
		assert!(q.contains("name contains 'O\\'Brien plan'"));
	}

	#[test]
	fn prefers_exported_text_over_description() {
		let file: File = serde_json::from_value(json!({
			"id": "doc-1",
			"name": "Roadmap",
			"mimeType": GOOGLE_DOC_MIME,
			"description": "Quarterly roadmap",
			"modifiedTime": "2026-03-01T12:30:00Z",
			"owners": [{ "emailAddress": "me@example.com", "me": true }]
		}))
		.expect("Failed to decode file.");
		let item = to_item(file, Some("Full text".to_string())).expect("Expected item.");

		assert_eq!(item.body, "Full text");
		assert_eq!(item.title, "Roadmap");
		assert!(item.authored_by_user);
		assert_eq!(item.occurred_at, datetime!(2026-03-01 12:30 UTC));
	}

	#[test]
	fn rejects_file_without_modified_time() {
		let file: File = serde_json::from_value(json!({ "id": "doc-2", "name": "Notes" }))
			.expect("Failed to decode file.");

		assert!(to_item(file, None).is_err());
	}
}
