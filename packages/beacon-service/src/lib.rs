pub mod estimate;
pub mod import;
pub mod jobs;
pub mod preferences;
pub mod project_match;
pub mod store;
pub mod time_serde;
pub mod writer;

mod error;

pub use error::{Error, Result};
pub use estimate::{EstimateRequest, EstimateResponse, EstimateTask};
pub use import::{DateRange, ImportFilters, ImportRequest, ImportResponse, ItemError, ItemErrorKind};
pub use jobs::ImportJobStatus;
pub use preferences::PreferencesResponse;
pub use store::{MemoryStore, Store};

use std::{future::Future, pin::Pin, sync::Arc};

use serde_json::Value;

use beacon_config::{Config, LlmProviderConfig, Sources};
use beacon_domain::{prompt::PromptMessages, source::Source};
use beacon_providers::{FetchOutcome, SourceQuery, retry::RetryPolicy};
use beacon_storage::db::Db;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Chat model that answers a rendered prompt with a JSON value.
pub trait ModelProvider
where
	Self: Send + Sync,
{
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		retry: &'a RetryPolicy,
		messages: &'a PromptMessages,
	) -> BoxFuture<'a, beacon_providers::Result<Value>>;
}

pub trait SourceProvider
where
	Self: Send + Sync,
{
	fn fetch<'a>(
		&'a self,
		cfg: &'a Sources,
		retry: &'a RetryPolicy,
		source: Source,
		token: &'a str,
		query: &'a SourceQuery,
	) -> BoxFuture<'a, beacon_providers::Result<FetchOutcome>>;
}

#[derive(Clone)]
pub struct Providers {
	pub model: Arc<dyn ModelProvider>,
	pub source: Arc<dyn SourceProvider>,
}
impl Providers {
	pub fn new(model: Arc<dyn ModelProvider>, source: Arc<dyn SourceProvider>) -> Self {
		Self { model, source }
	}
}
impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self { model: provider.clone(), source: provider }
	}
}

struct DefaultProviders;

impl ModelProvider for DefaultProviders {
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		retry: &'a RetryPolicy,
		messages: &'a PromptMessages,
	) -> BoxFuture<'a, beacon_providers::Result<Value>> {
		Box::pin(beacon_providers::llm::complete_json(
			cfg,
			retry,
			&messages.system_instruction,
			&messages.user_instruction,
		))
	}
}

impl SourceProvider for DefaultProviders {
	fn fetch<'a>(
		&'a self,
		cfg: &'a Sources,
		retry: &'a RetryPolicy,
		source: Source,
		token: &'a str,
		query: &'a SourceQuery,
	) -> BoxFuture<'a, beacon_providers::Result<FetchOutcome>> {
		Box::pin(beacon_providers::fetch_items(cfg, retry, source, token, query))
	}
}

pub struct BeaconService {
	pub cfg: Config,
	pub store: Arc<dyn Store>,
	pub providers: Providers,
	retry: RetryPolicy,
}
impl BeaconService {
	pub fn new(cfg: Config, db: Db) -> Self {
		Self::with_parts(cfg, Arc::new(db), Providers::default())
	}

	pub fn with_parts(cfg: Config, store: Arc<dyn Store>, providers: Providers) -> Self {
		let retry = RetryPolicy::from_config(&cfg.retry);

		Self { cfg, store, providers, retry }
	}

	pub(crate) fn retry(&self) -> &RetryPolicy {
		&self.retry
	}
}
