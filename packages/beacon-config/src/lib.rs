mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, Estimation, Import, LlmProviderConfig, Postgres, Providers, Retry, Security, Service,
	Sources, Storage,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	parse(&raw).map_err(|err| match err {
		Error::ParseConfig { source, .. } => Error::ParseConfig { path: path.to_path_buf(), source },
		other => other,
	})
}

/// Parses, normalizes, and validates a configuration document.
pub fn parse(raw: &str) -> Result<Config> {
	let mut cfg: Config = toml::from_str(raw)
		.map_err(|err| Error::ParseConfig { path: Default::default(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.dsn.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.postgres.dsn must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.llm.api_key.trim().is_empty() {
		return Err(Error::Validation {
			message: "Provider llm api_key must be non-empty.".to_string(),
		});
	}
	if !cfg.providers.llm.temperature.is_finite() || cfg.providers.llm.temperature < 0.0 {
		return Err(Error::Validation {
			message: "providers.llm.temperature must be a finite number zero or greater."
				.to_string(),
		});
	}

	for (label, value) in [
		("providers.llm.timeout_ms", cfg.providers.llm.timeout_ms),
		("sources.timeout_ms", cfg.sources.timeout_ms),
	] {
		if value == 0 {
			return Err(Error::Validation { message: format!("{label} must be greater than zero.") });
		}
	}

	if cfg.sources.page_size == 0 || cfg.sources.page_size > 500 {
		return Err(Error::Validation {
			message: "sources.page_size must be in the range 1-500.".to_string(),
		});
	}
	if cfg.import.max_items_cap == 0 {
		return Err(Error::Validation {
			message: "import.max_items_cap must be greater than zero.".to_string(),
		});
	}
	if cfg.import.default_max_items == 0 || cfg.import.default_max_items > cfg.import.max_items_cap
	{
		return Err(Error::Validation {
			message: "import.default_max_items must be in the range 1-import.max_items_cap."
				.to_string(),
		});
	}
	if !(1..=10).contains(&cfg.import.worker_concurrency) {
		return Err(Error::Validation {
			message: "import.worker_concurrency must be in the range 1-10.".to_string(),
		});
	}
	if cfg.import.max_errors == 0 {
		return Err(Error::Validation {
			message: "import.max_errors must be greater than zero.".to_string(),
		});
	}
	if cfg.retry.max_attempts == 0 {
		return Err(Error::Validation {
			message: "retry.max_attempts must be greater than zero.".to_string(),
		});
	}
	if cfg.retry.persistence_attempts == 0 {
		return Err(Error::Validation {
			message: "retry.persistence_attempts must be greater than zero.".to_string(),
		});
	}
	if cfg.retry.base_backoff_ms > cfg.retry.max_backoff_ms {
		return Err(Error::Validation {
			message: "retry.base_backoff_ms must not exceed retry.max_backoff_ms.".to_string(),
		});
	}
	if cfg.estimation.max_minutes_per_item == 0 {
		return Err(Error::Validation {
			message: "estimation.max_minutes_per_item must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.security.api_auth_token.as_deref().map(|token| token.trim().is_empty()).unwrap_or(false)
	{
		cfg.security.api_auth_token = None;
	}

	for base in [
		&mut cfg.providers.llm.api_base,
		&mut cfg.sources.gmail_api_base,
		&mut cfg.sources.calendar_api_base,
		&mut cfg.sources.drive_api_base,
	] {
		while base.ends_with('/') {
			base.pop();
		}
	}
}
