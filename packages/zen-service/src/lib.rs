pub mod chunk;
pub mod health;
pub mod images;
pub mod notes;
pub mod outliers;
pub mod search;
pub mod similarity;

mod error;

pub use chunk::{ChunkRequest, ChunkResponse, PassageItem};
pub use error::{Error, Result};
pub use health::HealthResponse;
pub use images::{IndexImageRequest, IndexImageResponse};
pub use notes::{IndexNoteRequest, IndexNoteResponse};
pub use outliers::{NoteOutliersRequest, NoteOutliersResponse, OutlierItem};
pub use search::{
	ImageSearchItem, NoteSearchItem, SearchImagesRequest, SearchImagesResponse,
	SearchNotesRequest, SearchNotesResponse,
};
pub use similarity::{SimilarNoteItem, SimilarNotesRequest, SimilarNotesResponse};

use std::{future::Future, path::PathBuf, pin::Pin, sync::Arc};

use uuid::Uuid;

use zen_chunking::ChunkingConfig;
use zen_config::{Config, EmbeddingProviderConfig};
use zen_domain::OutlierConfig;
use zen_providers::embedding;
use zen_storage::{
	models::{ImageHit, PassageHit, PassagePayload, StoredImage, StoredPassage},
	qdrant::QdrantStore,
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	/// One vector per input text, in input order.
	fn embed_texts<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>>;

	fn embed_images<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		paths: &'a [PathBuf],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>>;
}

/// Passage and image index.
pub trait VectorStore
where
	Self: Send + Sync,
{
	fn ensure_collections(&self) -> BoxFuture<'_, Result<()>>;

	/// Nearest passages, best first, none scoring below `score_threshold`.
	fn search_passages<'a>(
		&'a self,
		vector: &'a [f32],
		limit: u32,
		score_threshold: f32,
	) -> BoxFuture<'a, Result<Vec<PassageHit>>>;

	/// Stored passages of one note with their vectors.
	fn scroll_note_passages(
		&self,
		note_id: i64,
		limit: u32,
	) -> BoxFuture<'_, Result<Vec<StoredPassage>>>;

	fn upsert_passages<'a>(
		&'a self,
		passages: &'a [(PassagePayload, Vec<f32>)],
	) -> BoxFuture<'a, Result<Vec<Uuid>>>;

	fn delete_note_passages(&self, note_id: i64) -> BoxFuture<'_, Result<()>>;

	fn search_images<'a>(
		&'a self,
		vector: &'a [f32],
		limit: u32,
		score_threshold: f32,
	) -> BoxFuture<'a, Result<Vec<ImageHit>>>;

	fn upsert_image<'a>(&'a self, image: &'a StoredImage) -> BoxFuture<'a, Result<()>>;

	fn delete_image<'a>(&'a self, filename: &'a str) -> BoxFuture<'a, Result<()>>;

	/// Backend version string when reachable.
	fn health_check(&self) -> BoxFuture<'_, Result<String>>;
}

pub struct ZenService {
	pub cfg: Config,
	pub store: Arc<dyn VectorStore>,
	pub embedding: Arc<dyn EmbeddingProvider>,
}
impl ZenService {
	pub fn new(cfg: Config, store: QdrantStore) -> Self {
		Self { cfg, store: Arc::new(store), embedding: Arc::new(DefaultEmbedding) }
	}

	pub fn with_collaborators(
		cfg: Config,
		store: Arc<dyn VectorStore>,
		embedding: Arc<dyn EmbeddingProvider>,
	) -> Self {
		Self { cfg, store, embedding }
	}

	/// Creates the note and image collections when they are missing.
	pub async fn ensure_collections(&self) -> Result<()> {
		self.store.ensure_collections().await
	}

	pub(crate) fn chunking_config(&self) -> ChunkingConfig {
		let chunking = &self.cfg.chunking;

		ChunkingConfig {
			break_threshold: chunking.break_threshold,
			min_sentences: chunking.min_sentences as usize,
			max_sentences: chunking.max_sentences as usize,
		}
	}

	pub(crate) fn outlier_config(&self) -> OutlierConfig {
		let outliers = &self.cfg.outliers;

		OutlierConfig {
			eps: outliers.eps,
			min_samples: outliers.min_samples as usize,
			min_passages: outliers.min_passages as usize,
			score_threshold: outliers.score_threshold,
		}
	}
}

struct DefaultEmbedding;
impl EmbeddingProvider for DefaultEmbedding {
	fn embed_texts<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		Box::pin(async move { Ok(embedding::embed(cfg, texts).await?) })
	}

	fn embed_images<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		paths: &'a [PathBuf],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		Box::pin(async move { Ok(embedding::embed_images(cfg, paths).await?) })
	}
}

impl VectorStore for QdrantStore {
	fn ensure_collections(&self) -> BoxFuture<'_, Result<()>> {
		Box::pin(async move { Ok(QdrantStore::ensure_collections(self).await?) })
	}

	fn search_passages<'a>(
		&'a self,
		vector: &'a [f32],
		limit: u32,
		score_threshold: f32,
	) -> BoxFuture<'a, Result<Vec<PassageHit>>> {
		Box::pin(async move {
			Ok(QdrantStore::search_passages(self, vector, limit, score_threshold).await?)
		})
	}

	fn scroll_note_passages(
		&self,
		note_id: i64,
		limit: u32,
	) -> BoxFuture<'_, Result<Vec<StoredPassage>>> {
		Box::pin(async move { Ok(QdrantStore::scroll_note_passages(self, note_id, limit).await?) })
	}

	fn upsert_passages<'a>(
		&'a self,
		passages: &'a [(PassagePayload, Vec<f32>)],
	) -> BoxFuture<'a, Result<Vec<Uuid>>> {
		Box::pin(async move { Ok(QdrantStore::upsert_passages(self, passages).await?) })
	}

	fn delete_note_passages(&self, note_id: i64) -> BoxFuture<'_, Result<()>> {
		Box::pin(async move { Ok(QdrantStore::delete_note_passages(self, note_id).await?) })
	}

	fn search_images<'a>(
		&'a self,
		vector: &'a [f32],
		limit: u32,
		score_threshold: f32,
	) -> BoxFuture<'a, Result<Vec<ImageHit>>> {
		Box::pin(async move {
			Ok(QdrantStore::search_images(self, vector, limit, score_threshold).await?)
		})
	}

	fn upsert_image<'a>(&'a self, image: &'a StoredImage) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move { Ok(QdrantStore::upsert_image(self, image).await?) })
	}

	fn delete_image<'a>(&'a self, filename: &'a str) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move { Ok(QdrantStore::delete_image(self, filename).await?) })
	}

	fn health_check(&self) -> BoxFuture<'_, Result<String>> {
		Box::pin(async move { Ok(QdrantStore::health_check(self).await?) })
	}
}
