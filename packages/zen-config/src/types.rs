use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub chunking: Chunking,
	#[serde(default)]
	pub outliers: Outliers,
	#[serde(default)]
	pub similarity: Similarity,
	#[serde(default)]
	pub search: Search,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	#[serde(default = "default_log_level")]
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub qdrant: Qdrant,
}

#[derive(Debug, Deserialize)]
pub struct Qdrant {
	pub url: String,
	/// Optional. Sent as the `api-key` header when set.
	pub api_key: Option<String>,
	#[serde(default = "default_notes_collection")]
	pub notes_collection: String,
	#[serde(default = "default_images_collection")]
	pub images_collection: String,
	pub text_vector_dim: u32,
	pub image_vector_dim: u32,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	/// Embeds note passages, sentences and note search queries.
	pub text_embedding: EmbeddingProviderConfig,
	/// Embeds image files into the image space.
	pub image_embedding: EmbeddingProviderConfig,
	/// Embeds text queries into the image space.
	pub image_query_embedding: EmbeddingProviderConfig,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Chunking {
	/// Adjacent sentences below this cosine similarity request a passage boundary.
	pub break_threshold: f32,
	pub min_sentences: u32,
	pub max_sentences: u32,
}
impl Default for Chunking {
	fn default() -> Self {
		Self { break_threshold: 0.5, min_sentences: 2, max_sentences: 10 }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Outliers {
	/// DBSCAN neighborhood radius in cosine distance.
	pub eps: f32,
	pub min_samples: u32,
	/// Notes with fewer passages than this are never scored.
	pub min_passages: u32,
	pub score_threshold: f32,
}
impl Default for Outliers {
	fn default() -> Self {
		Self { eps: 0.3, min_samples: 3, min_passages: 5, score_threshold: 0.5 }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Similarity {
	pub default_limit: u32,
	pub default_threshold: f32,
	/// Each passage query fetches `limit * overfetch_factor` candidates.
	pub overfetch_factor: u32,
	/// Weight of a match that originates from an outlier passage.
	pub outlier_weight: u32,
	pub max_source_passages: u32,
}
impl Default for Similarity {
	fn default() -> Self {
		Self {
			default_limit: 10,
			default_threshold: 0.65,
			overfetch_factor: 3,
			outlier_weight: 3,
			max_source_passages: 1_000,
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Search {
	pub default_limit: u32,
	pub note_score_threshold: f32,
	pub image_score_threshold: f32,
}
impl Default for Search {
	fn default() -> Self {
		Self { default_limit: 20, note_score_threshold: 0.55, image_score_threshold: 0.25 }
	}
}

fn default_log_level() -> String {
	"info".to_string()
}

fn default_notes_collection() -> String {
	"notes_v1".to_string()
}

fn default_images_collection() -> String {
	"images_v1".to_string()
}
