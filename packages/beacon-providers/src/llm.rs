use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::{Error, Result, retry::RetryPolicy};

/// Sends one system/user exchange to an OpenAI-compatible chat endpoint and returns the answer
/// content parsed as JSON. Content that is not JSON is an [`Error::InvalidResponse`] and is not
/// retried.
pub async fn complete_json(
	cfg: &beacon_config::LlmProviderConfig,
	policy: &RetryPolicy,
	system_instruction: &str,
	user_instruction: &str,
) -> Result<Value> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let headers = crate::auth_headers(&cfg.api_key, &cfg.default_headers)?;
	let body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"response_format": { "type": "json_object" },
		"messages": [
			{ "role": "system", "content": system_instruction },
			{ "role": "user", "content": user_instruction },
		],
	});
	let json: Value = crate::retry::with_retry(policy, &cfg.provider_id, || {
		let request = client.post(&url).headers(headers.clone()).json(&body);

		async move { Ok(crate::ensure_success(request.send().await?).await?.json().await?) }
	})
	.await?;

	parse_chat_json(json)
}

pub fn parse_chat_json(json: Value) -> Result<Value> {
	let content = json
		.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
		.ok_or_else(|| Error::InvalidResponse {
			message: "Chat response is missing choices[0].message.content.".to_string(),
		})?;

	serde_json::from_str(content.trim()).map_err(|err| Error::InvalidResponse {
		message: format!(
			"Model content is not valid JSON ({err}): {}",
			beacon_domain::truncate::snippet(content, 200)
		),
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_choice_content_json() {
		let json = serde_json::json!({
			"choices": [
				{ "message": { "content": "{\"estimated_minutes\": 5}" } }
			]
		});
		let parsed = parse_chat_json(json).expect("parse failed");

		assert_eq!(parsed["estimated_minutes"], 5);
	}

	#[test]
	fn rejects_prose_content() {
		let json = serde_json::json!({
			"choices": [
				{ "message": { "content": "About five minutes." } }
			]
		});
		let err = parse_chat_json(json).expect_err("Expected rejection.");

		assert!(err.to_string().contains("About five minutes."));
		assert!(!err.is_transient());
	}

	#[test]
	fn rejects_envelope_without_choices() {
		assert!(parse_chat_json(serde_json::json!({ "id": "x" })).is_err());
	}
}
