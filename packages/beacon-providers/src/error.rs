pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Upstream returned HTTP {status}: {body}")]
	Http { status: u16, body: String },
	#[error(transparent)]
	Reqwest(#[from] reqwest::Error),
	#[error(transparent)]
	SerdeJson(#[from] serde_json::Error),
	#[error(transparent)]
	InvalidHeaderName(#[from] reqwest::header::InvalidHeaderName),
	#[error(transparent)]
	InvalidHeaderValue(#[from] reqwest::header::InvalidHeaderValue),
	#[error(transparent)]
	TimeFormat(#[from] time::error::Format),
	#[error("{message}")]
	InvalidConfig { message: String },
	#[error("{message}")]
	InvalidResponse { message: String },
}
impl Error {
	/// The upstream rejected the caller's credentials.
	pub fn is_auth_failure(&self) -> bool {
		matches!(self, Self::Http { status: 401 | 403, .. })
	}

	/// Worth another attempt: 5xx, 429, timeouts, and connection failures.
	pub fn is_transient(&self) -> bool {
		match self {
			Self::Http { status, .. } => *status == 429 || (500..600).contains(status),
			Self::Reqwest(err) => err.is_timeout() || err.is_connect(),
			_ => false,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn http(status: u16) -> Error {
		Error::Http { status, body: String::new() }
	}

	#[test]
	fn classifies_status_codes() {
		assert!(http(503).is_transient());
		assert!(http(429).is_transient());
		assert!(!http(400).is_transient());
		assert!(!http(401).is_transient());
		assert!(http(401).is_auth_failure());
		assert!(http(403).is_auth_failure());
		assert!(!http(404).is_auth_failure());
	}

	#[test]
	fn malformed_content_is_not_retried() {
		let err = Error::InvalidResponse { message: "not json".to_string() };

		assert!(!err.is_transient());
		assert!(!err.is_auth_failure());
	}
}
