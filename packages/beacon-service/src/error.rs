pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Invalid {field}: {message}")]
	InvalidField { field: String, message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Source authentication failed: {message}")]
	SourceAuthFailed { message: String },
	#[error("Source unavailable: {message}")]
	SourceUnavailable { message: String },
	#[error("Model error: {message}")]
	Model { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
}
impl Error {
	pub(crate) fn field(field: &str, message: impl Into<String>) -> Self {
		Self::InvalidField { field: field.to_string(), message: message.into() }
	}
}

impl From<beacon_storage::Error> for Error {
	fn from(err: beacon_storage::Error) -> Self {
		match err {
			beacon_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			beacon_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			beacon_storage::Error::NotFound(message) => Self::NotFound { message },
		}
	}
}

impl From<beacon_domain::preferences::PreferenceError> for Error {
	fn from(err: beacon_domain::preferences::PreferenceError) -> Self {
		Self::InvalidField { field: err.field.to_string(), message: err.message }
	}
}
