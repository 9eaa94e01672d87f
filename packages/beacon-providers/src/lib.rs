pub mod calendar;
pub mod drive;
pub mod error;
pub mod gmail;
pub mod llm;
pub mod retry;

pub use error::{Error, Result};

use std::time::Duration;

use reqwest::{
	Client, Response,
	header::{AUTHORIZATION, HeaderMap, HeaderName},
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use time::OffsetDateTime;

use beacon_domain::{
	source::{RawActivityItem, Source},
	truncate,
};
use retry::RetryPolicy;

const ERROR_BODY_CHARS: usize = 200;

/// What to fetch from a source for one import.
#[derive(Debug, Clone)]
pub struct SourceQuery {
	/// Inclusive lower bound.
	pub start: OffsetDateTime,
	/// Exclusive upper bound.
	pub end: OffsetDateTime,
	pub max_items: usize,
	pub query: Option<String>,
	pub calendar_id: Option<String>,
	pub folder_id: Option<String>,
	pub only_opened_emails: bool,
	pub skip_promotional: bool,
}

/// Items fetched for one import, plus the items that were listed but could not be read.
#[derive(Debug, Default)]
pub struct FetchOutcome {
	pub items: Vec<RawActivityItem>,
	pub failures: Vec<ItemFetchFailure>,
}

#[derive(Debug, Clone)]
pub struct ItemFetchFailure {
	pub item_id: String,
	pub message: String,
}

pub fn auth_headers(api_key: &str, default_headers: &Map<String, Value>) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	headers.insert(AUTHORIZATION, format!("Bearer {api_key}").parse()?);

	for (key, value) in default_headers {
		let Some(raw) = value.as_str() else {
			return Err(Error::InvalidConfig {
				message: "Default header values must be strings.".to_string(),
			});
		};

		headers.insert(HeaderName::from_bytes(key.as_bytes())?, raw.parse()?);
	}

	Ok(headers)
}

/// Fetches up to `query.max_items` items from `source` with the user's access token.
///
/// Authentication failures abort the fetch. Other failures on a single item are reported in
/// [`FetchOutcome::failures`] so the import can count them.
pub async fn fetch_items(
	cfg: &beacon_config::Sources,
	policy: &RetryPolicy,
	source: Source,
	token: &str,
	query: &SourceQuery,
) -> Result<FetchOutcome> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let page_size = cfg.page_size as usize;
	let outcome = match source {
		Source::Gmail =>
			gmail::fetch(&client, policy, &cfg.gmail_api_base, page_size, token, query).await?,
		Source::Calendar =>
			calendar::fetch(&client, policy, &cfg.calendar_api_base, page_size, token, query)
				.await?,
		Source::Drive =>
			drive::fetch(&client, policy, &cfg.drive_api_base, page_size, token, query).await?,
	};

	tracing::info!(
		source = source.as_str(),
		fetched = outcome.items.len(),
		unreadable = outcome.failures.len(),
		"Fetched source items."
	);

	Ok(outcome)
}

pub(crate) async fn ensure_success(res: Response) -> Result<Response> {
	let status = res.status();

	if status.is_success() {
		return Ok(res);
	}

	let body = res.text().await.unwrap_or_default();

	Err(Error::Http { status: status.as_u16(), body: truncate::snippet(&body, ERROR_BODY_CHARS) })
}

pub(crate) async fn get_json<T>(
	client: &Client,
	policy: &RetryPolicy,
	token: &str,
	url: &str,
	query: &[(&str, String)],
) -> Result<T>
where
	T: DeserializeOwned,
{
	retry::with_retry(policy, url, || async move {
		let res = client.get(url).bearer_auth(token).query(query).send().await?;

		Ok(ensure_success(res).await?.json::<T>().await?)
	})
	.await
}

pub(crate) async fn get_text(
	client: &Client,
	policy: &RetryPolicy,
	token: &str,
	url: &str,
	query: &[(&str, String)],
) -> Result<String> {
	retry::with_retry(policy, url, || async move {
		let res = client.get(url).bearer_auth(token).query(query).send().await?;

		Ok(ensure_success(res).await?.text().await?)
	})
	.await
}

/// Records a per-item failure, or propagates it when the credentials were rejected.
pub(crate) fn record_item_failure(
	outcome: &mut FetchOutcome,
	item_id: &str,
	err: Error,
) -> Result<()> {
	if err.is_auth_failure() {
		return Err(err);
	}

	tracing::warn!(item_id, error = %err, "Failed to read source item.");

	outcome.failures.push(ItemFetchFailure { item_id: item_id.to_string(), message: err.to_string() });

	Ok(())
}
