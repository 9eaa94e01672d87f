use std::{
	sync::atomic::{AtomicU32, Ordering},
	time::Duration,
};

use reqwest::header::AUTHORIZATION;
use serde_json::{Map, Value};

use beacon_providers::{
	Error,
	retry::{self, RetryPolicy},
};

fn fast_policy(max_attempts: u32) -> RetryPolicy {
	RetryPolicy {
		max_attempts,
		base_backoff: Duration::from_millis(1),
		max_backoff: Duration::from_millis(2),
	}
}

#[test]
fn builds_bearer_auth_header() {
	let headers =
		beacon_providers::auth_headers("secret", &Map::new()).expect("Failed to build headers.");
	let value = headers.get(AUTHORIZATION).expect("Missing authorization header.");

	assert_eq!(value, "Bearer secret");
}

#[test]
fn rejects_non_string_default_headers() {
	let mut defaults = Map::new();

	defaults.insert("X-Org".to_string(), Value::from(7));

	assert!(beacon_providers::auth_headers("secret", &defaults).is_err());
}

#[tokio::test]
async fn retries_transient_failures_until_success() {
	let calls = AtomicU32::new(0);
	let counter = &calls;
	let result = retry::with_retry(&fast_policy(3), "test", move || async move {
		if counter.fetch_add(1, Ordering::SeqCst) < 2 {
			Err(Error::Http { status: 503, body: String::new() })
		} else {
			Ok("done")
		}
	})
	.await;

	assert_eq!(result.expect("Expected success."), "done");
	assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn gives_up_after_max_attempts() {
	let calls = AtomicU32::new(0);
	let counter = &calls;
	let result: beacon_providers::Result<()> =
		retry::with_retry(&fast_policy(3), "test", move || async move {
			counter.fetch_add(1, Ordering::SeqCst);

			Err(Error::Http { status: 429, body: String::new() })
		})
		.await;

	assert!(result.is_err());
	assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn does_not_retry_auth_failures() {
	let calls = AtomicU32::new(0);
	let counter = &calls;
	let result: beacon_providers::Result<()> =
		retry::with_retry(&fast_policy(3), "test", move || async move {
			counter.fetch_add(1, Ordering::SeqCst);

			Err(Error::Http { status: 401, body: String::new() })
		})
		.await;

	assert!(result.expect_err("Expected failure.").is_auth_failure());
	assert_eq!(calls.load(Ordering::SeqCst), 1);
}
