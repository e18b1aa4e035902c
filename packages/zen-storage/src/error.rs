#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Qdrant(#[from] Box<qdrant_client::QdrantError>),
	#[error(transparent)]
	SerdeJson(#[from] serde_json::Error),
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),
	#[error("Malformed point {point_id}: {message}")]
	MalformedPoint { point_id: String, message: String },
}
impl From<qdrant_client::QdrantError> for Error {
	fn from(err: qdrant_client::QdrantError) -> Self {
		Self::Qdrant(Box::new(err))
	}
}
