pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Production error: {message}")]
	Production { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
	#[error("Timed out: {message}")]
	Timeout { message: String },
}
impl Error {
	/// Stable name recorded in run logs.
	pub fn kind(&self) -> &'static str {
		match self {
			Self::InvalidRequest { .. } => "invalid_request",
			Self::Provider { .. } => "provider",
			Self::Production { .. } => "production",
			Self::Storage { .. } => "storage",
			Self::Timeout { .. } => "timeout",
		}
	}
}

impl From<curio_storage::Error> for Error {
	fn from(err: curio_storage::Error) -> Self {
		match err {
			curio_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			curio_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
		}
	}
}

impl From<curio_providers::Error> for Error {
	fn from(err: curio_providers::Error) -> Self {
		Self::Provider { message: err.to_string() }
	}
}
