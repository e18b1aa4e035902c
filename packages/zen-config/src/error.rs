pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Failed to read config file at {path:?}.")]
	ReadConfig { path: std::path::PathBuf, source: std::io::Error },
	#[error("Failed to parse config file at {path:?}.")]
	ParseConfig { path: std::path::PathBuf, source: toml::de::Error },
	#[error("{field} {message}")]
	Validation { field: String, message: String },
}
impl Error {
	pub(crate) fn validation(field: &str, message: &str) -> Self {
		Self::Validation { field: field.to_string(), message: message.to_string() }
	}
}
