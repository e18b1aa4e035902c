use std::{collections::HashMap, hash::Hash};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use zen_config::EmbeddingProviderConfig;
use zen_storage::models::ImagePayload;

use crate::{Error, Result, ZenService};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchNotesRequest {
	pub query: String,
	pub limit: Option<u32>,
	pub score_threshold: Option<f32>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchNotesResponse {
	pub items: Vec<NoteSearchItem>,
}

/// Best-scoring passage of one note.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NoteSearchItem {
	pub note_id: i64,
	pub passage_id: Uuid,
	pub chunk_index: i32,
	pub score: f32,
	pub text: String,
	pub title: String,
	pub tags: Vec<String>,
	pub updated_at: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchImagesRequest {
	pub query: String,
	pub limit: Option<u32>,
	pub score_threshold: Option<f32>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchImagesResponse {
	pub items: Vec<ImageSearchItem>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImageSearchItem {
	pub image_id: Uuid,
	pub score: f32,
	#[serde(flatten)]
	pub payload: ImagePayload,
}

impl ZenService {
	pub async fn search_notes(&self, req: SearchNotesRequest) -> Result<SearchNotesResponse> {
		let limit = resolve_limit(req.limit, self.cfg.search.default_limit)?;
		let threshold =
			resolve_threshold(req.score_threshold, self.cfg.search.note_score_threshold)?;
		let vector = self.embed_query(&self.cfg.providers.text_embedding, &req.query).await?;
		let hits = self.store.search_passages(&vector, limit, threshold).await?;
		let hit_count = hits.len();
		let items = best_per_key(
			hits.into_iter().map(|hit| NoteSearchItem {
				note_id: hit.payload.note_id,
				passage_id: hit.passage_id,
				chunk_index: hit.payload.chunk_index,
				score: hit.score,
				text: hit.payload.text,
				title: hit.payload.title,
				tags: hit.payload.tags,
				updated_at: hit.payload.updated_at,
			}),
			|item| item.note_id,
			|item| item.score,
		);

		tracing::debug!(hits = hit_count, notes = items.len(), "Note search finished.");

		Ok(SearchNotesResponse { items })
	}

	pub async fn search_images(&self, req: SearchImagesRequest) -> Result<SearchImagesResponse> {
		let limit = resolve_limit(req.limit, self.cfg.search.default_limit)?;
		let threshold =
			resolve_threshold(req.score_threshold, self.cfg.search.image_score_threshold)?;
		let vector =
			self.embed_query(&self.cfg.providers.image_query_embedding, &req.query).await?;
		let hits = self.store.search_images(&vector, limit, threshold).await?;
		let hit_count = hits.len();
		let items = best_per_key(
			hits.into_iter().map(|hit| ImageSearchItem {
				image_id: hit.image_id,
				score: hit.score,
				payload: hit.payload,
			}),
			|item| item.payload.filename.clone(),
			|item| item.score,
		);

		tracing::debug!(hits = hit_count, images = items.len(), "Image search finished.");

		Ok(SearchImagesResponse { items })
	}

	async fn embed_query(&self, cfg: &EmbeddingProviderConfig, query: &str) -> Result<Vec<f32>> {
		let query = query.trim();

		if query.is_empty() {
			return Err(Error::InvalidRequest { message: "query must not be empty.".to_string() });
		}

		let texts = [query.to_string()];
		let vectors = self.embedding.embed_texts(cfg, &texts).await?;

		vectors.into_iter().next().ok_or_else(|| Error::Provider {
			message: "Embedding provider returned no vector for the query.".to_string(),
		})
	}
}

pub(crate) fn resolve_limit(requested: Option<u32>, default: u32) -> Result<u32> {
	match requested {
		Some(0) =>
			Err(Error::InvalidRequest { message: "limit must be greater than zero.".to_string() }),
		Some(limit) => Ok(limit),
		None => Ok(default),
	}
}

pub(crate) fn resolve_threshold(requested: Option<f32>, default: f32) -> Result<f32> {
	match requested {
		Some(threshold) if !threshold.is_finite() => Err(Error::InvalidRequest {
			message: "score_threshold must be a finite number.".to_string(),
		}),
		Some(threshold) => Ok(threshold),
		None => Ok(default),
	}
}

/// Keeps the highest-scoring item per key and orders the survivors by descending score.
fn best_per_key<T, K, I, FK, FS>(items: I, key_of: FK, score_of: FS) -> Vec<T>
where
	I: IntoIterator<Item = T>,
	K: Eq + Hash,
	FK: Fn(&T) -> K,
	FS: Fn(&T) -> f32,
{
	let mut best: HashMap<K, T> = HashMap::new();

	for item in items {
		let key = key_of(&item);

		match best.get(&key) {
			Some(current) if score_of(current) >= score_of(&item) => {},
			_ => {
				best.insert(key, item);
			},
		}
	}

	let mut out = best.into_values().collect::<Vec<_>>();

	out.sort_by(|a, b| score_of(b).total_cmp(&score_of(a)));

	out
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn best_per_key_keeps_top_score_per_key() {
		let items = vec![(1, 0.6_f32), (2, 0.9), (1, 0.8), (3, 0.7), (2, 0.5)];
		let out = best_per_key(items, |item| item.0, |item| item.1);

		assert_eq!(out, vec![(2, 0.9), (1, 0.8), (3, 0.7)]);
	}

	#[test]
	fn limits_and_thresholds_are_checked() {
		assert_eq!(resolve_limit(None, 20).expect("default limit"), 20);
		assert!(matches!(resolve_limit(Some(0), 20), Err(Error::InvalidRequest { .. })));
		assert!(matches!(
			resolve_threshold(Some(f32::NAN), 0.5),
			Err(Error::InvalidRequest { .. })
		));
		assert_eq!(resolve_threshold(Some(0.1), 0.5).expect("explicit threshold"), 0.1);
	}
}
