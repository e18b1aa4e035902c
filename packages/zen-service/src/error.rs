pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
}
impl From<zen_storage::Error> for Error {
	fn from(err: zen_storage::Error) -> Self {
		match err {
			zen_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			other => Self::Storage { message: other.to_string() },
		}
	}
}

impl From<zen_providers::Error> for Error {
	fn from(err: zen_providers::Error) -> Self {
		match err {
			zen_providers::Error::MissingImage { path } =>
				Self::InvalidRequest { message: format!("Image not found at {path:?}.") },
			other => Self::Provider { message: other.to_string() },
		}
	}
}
