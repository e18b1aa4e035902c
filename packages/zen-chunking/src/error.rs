pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Expected {expected} sentence embeddings, got {actual}.")]
	EmbeddingCountMismatch { expected: usize, actual: usize },
}
