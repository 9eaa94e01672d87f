use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	pub sources: Sources,
	#[serde(default)]
	pub import: Import,
	#[serde(default)]
	pub retry: Retry,
	#[serde(default)]
	pub estimation: Estimation,
	pub security: Security,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub llm: LlmProviderConfig,
}

/// OpenAI-compatible chat completion endpoint used for estimation and project matching.
#[derive(Debug, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct Sources {
	#[serde(default = "default_gmail_api_base")]
	pub gmail_api_base: String,
	#[serde(default = "default_calendar_api_base")]
	pub calendar_api_base: String,
	#[serde(default = "default_drive_api_base")]
	pub drive_api_base: String,
	pub timeout_ms: u64,
	/// Upper bound for one listing page. Google caps most list endpoints at 100 or 250.
	#[serde(default = "default_page_size")]
	pub page_size: u32,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Import {
	pub default_max_items: u32,
	pub max_items_cap: u32,
	pub worker_concurrency: u32,
	/// Cap on error entries returned per job. Counts stay exact beyond the cap.
	pub max_errors: u32,
}
impl Default for Import {
	fn default() -> Self {
		Self { default_max_items: 50, max_items_cap: 500, worker_concurrency: 5, max_errors: 20 }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Retry {
	pub max_attempts: u32,
	pub base_backoff_ms: u64,
	pub max_backoff_ms: u64,
	pub persistence_attempts: u32,
}
impl Default for Retry {
	fn default() -> Self {
		Self { max_attempts: 3, base_backoff_ms: 250, max_backoff_ms: 4_000, persistence_attempts: 2 }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Estimation {
	pub max_minutes_per_item: u32,
	pub match_projects: bool,
}
impl Default for Estimation {
	fn default() -> Self {
		Self { max_minutes_per_item: 480, match_projects: true }
	}
}

#[derive(Debug, Deserialize)]
pub struct Security {
	pub bind_localhost_only: bool,
	pub api_auth_token: Option<String>,
}

fn default_gmail_api_base() -> String {
	"https://gmail.googleapis.com/gmail/v1/users/me".to_string()
}

fn default_calendar_api_base() -> String {
	"https://www.googleapis.com/calendar/v3".to_string()
}

fn default_drive_api_base() -> String {
	"https://www.googleapis.com/drive/v3".to_string()
}

fn default_page_size() -> u32 {
	100
}
