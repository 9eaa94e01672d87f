use std::{
	env, fs,
	path::PathBuf,
	sync::atomic::{AtomicU64, Ordering},
};

use toml::Value;

use beacon_config::Error;

const SAMPLE_CONFIG_TOML: &str = include_str!("fixtures/sample_config.toml");

static NEXT_FILE_ID: AtomicU64 = AtomicU64::new(0);

fn sample_with(section: &str, key: &str, value: Value) -> String {
	let mut doc: Value = toml::from_str(SAMPLE_CONFIG_TOML).expect("Failed to parse sample config.");
	let root = doc.as_table_mut().expect("Sample config must be a table.");
	let table = root
		.get_mut(section)
		.and_then(Value::as_table_mut)
		.expect("Sample config must include the requested section.");

	table.insert(key.to_string(), value);

	toml::to_string(&doc).expect("Failed to render sample config.")
}

fn sample_without(section: &str) -> String {
	let mut doc: Value = toml::from_str(SAMPLE_CONFIG_TOML).expect("Failed to parse sample config.");

	doc.as_table_mut().expect("Sample config must be a table.").remove(section);

	toml::to_string(&doc).expect("Failed to render sample config.")
}

fn write_temp_config(payload: &str) -> PathBuf {
	let id = NEXT_FILE_ID.fetch_add(1, Ordering::SeqCst);
	let path = env::temp_dir()
		.join(format!("beacon_config_test_{}_{}.toml", std::process::id(), id));

	fs::write(&path, payload).expect("Failed to write test config.");

	path
}

fn expect_validation_error(payload: &str, needle: &str) {
	let err = beacon_config::parse(payload).expect_err("Expected config validation error.");

	match err {
		Error::Validation { message } => assert!(
			message.contains(needle),
			"Unexpected validation message {message:?}; expected it to mention {needle:?}."
		),
		other => panic!("Unexpected error: {other:?}"),
	}
}

#[test]
fn sample_config_loads_from_disk() {
	let path = write_temp_config(SAMPLE_CONFIG_TOML);
	let cfg = beacon_config::load(&path).expect("Failed to load sample config.");

	fs::remove_file(&path).expect("Failed to remove test config.");

	assert_eq!(cfg.service.http_bind, "127.0.0.1:8090");
	assert_eq!(cfg.import.worker_concurrency, 5);
	assert_eq!(cfg.retry.max_attempts, 3);
	assert_eq!(cfg.estimation.max_minutes_per_item, 480);
}

#[test]
fn missing_file_reports_read_error() {
	let path = env::temp_dir().join("beacon_config_test_missing_file.toml");
	let err = beacon_config::load(&path).expect_err("Expected read error.");

	assert!(matches!(err, Error::ReadConfig { .. }));
}

#[test]
fn malformed_toml_reports_parse_error_with_path() {
	let path = write_temp_config("[service\nhttp_bind = ");
	let err = beacon_config::load(&path).expect_err("Expected parse error.");

	fs::remove_file(&path).expect("Failed to remove test config.");

	match err {
		Error::ParseConfig { path: reported, .. } => assert_eq!(reported, path),
		other => panic!("Unexpected error: {other:?}"),
	}
}

#[test]
fn blank_api_auth_token_is_normalized_to_none() {
	let cfg = beacon_config::parse(SAMPLE_CONFIG_TOML).expect("Failed to parse sample config.");

	assert!(cfg.security.api_auth_token.is_none());
}

#[test]
fn trailing_slashes_are_trimmed_from_api_bases() {
	let cfg = beacon_config::parse(SAMPLE_CONFIG_TOML).expect("Failed to parse sample config.");

	assert_eq!(cfg.providers.llm.api_base, "https://api.openai.com");
	assert_eq!(cfg.sources.gmail_api_base, "https://gmail.googleapis.com/gmail/v1/users/me");
}

#[test]
fn optional_sections_fall_back_to_defaults() {
	let payload = sample_without("import");
	let payload = {
		let mut doc: Value = toml::from_str(&payload).expect("Failed to parse config.");
		let root = doc.as_table_mut().expect("Config must be a table.");

		root.remove("retry");
		root.remove("estimation");

		toml::to_string(&doc).expect("Failed to render config.")
	};
	let cfg = beacon_config::parse(&payload).expect("Failed to parse config without defaults.");

	assert_eq!(cfg.import.default_max_items, 50);
	assert_eq!(cfg.import.max_errors, 20);
	assert_eq!(cfg.retry.persistence_attempts, 2);
	assert!(cfg.estimation.match_projects);
}

#[test]
fn rejects_worker_concurrency_outside_bounds() {
	expect_validation_error(
		&sample_with("import", "worker_concurrency", Value::Integer(0)),
		"import.worker_concurrency",
	);
	expect_validation_error(
		&sample_with("import", "worker_concurrency", Value::Integer(11)),
		"import.worker_concurrency",
	);
}

#[test]
fn rejects_zero_max_errors() {
	expect_validation_error(
		&sample_with("import", "max_errors", Value::Integer(0)),
		"import.max_errors",
	);
}

#[test]
fn rejects_default_max_items_above_cap() {
	expect_validation_error(
		&sample_with("import", "default_max_items", Value::Integer(501)),
		"import.default_max_items",
	);
}

#[test]
fn rejects_zero_retry_attempts() {
	expect_validation_error(
		&sample_with("retry", "max_attempts", Value::Integer(0)),
		"retry.max_attempts",
	);
}

#[test]
fn rejects_backoff_base_above_cap() {
	expect_validation_error(
		&sample_with("retry", "base_backoff_ms", Value::Integer(10_000)),
		"retry.base_backoff_ms",
	);
}

#[test]
fn rejects_zero_source_timeout() {
	expect_validation_error(
		&sample_with("sources", "timeout_ms", Value::Integer(0)),
		"sources.timeout_ms",
	);
}

#[test]
fn rejects_empty_llm_api_key() {
	let mut doc: Value = toml::from_str(SAMPLE_CONFIG_TOML).expect("Failed to parse config.");
	let llm = doc
		.get_mut("providers")
		.and_then(|providers| providers.get_mut("llm"))
		.and_then(Value::as_table_mut)
		.expect("Sample config must include [providers.llm].");

	llm.insert("api_key".to_string(), Value::String("  ".to_string()));

	expect_validation_error(&toml::to_string(&doc).expect("Failed to render config."), "api_key");
}
