use serde::{Deserialize, Serialize};
use uuid::Uuid;

use zen_storage::models::PassagePayload;

use crate::{Error, Result, ZenService};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IndexNoteRequest {
	pub note_id: i64,
	pub text: String,
	#[serde(default)]
	pub title: String,
	#[serde(default)]
	pub tags: Vec<String>,
	#[serde(default)]
	pub updated_at: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IndexNoteResponse {
	pub note_id: i64,
	pub passage_ids: Vec<Uuid>,
	pub fallback: bool,
}

impl ZenService {
	/// Replaces every stored passage of the note with freshly chunked and embedded ones.
	///
	/// Stored passages are only removed once the new ones are embedded, so a failed re-index
	/// leaves the previous passages in place.
	pub async fn index_note(&self, req: IndexNoteRequest) -> Result<IndexNoteResponse> {
		let IndexNoteRequest { note_id, text, title, tags, updated_at } = req;
		let outcome = self.chunk_text(&text).await;

		if outcome.chunks.is_empty() {
			self.store.delete_note_passages(note_id).await?;

			tracing::info!(note_id, "Note has no text to index. Cleared its passages.");

			return Ok(IndexNoteResponse {
				note_id,
				passage_ids: Vec::new(),
				fallback: outcome.fallback,
			});
		}

		let texts = outcome.chunks.iter().map(|chunk| chunk.text.clone()).collect::<Vec<_>>();
		let vectors =
			self.embedding.embed_texts(&self.cfg.providers.text_embedding, &texts).await?;

		if vectors.len() != outcome.chunks.len() {
			return Err(Error::Provider {
				message: format!(
					"Embedding provider returned {} vectors for {} passages.",
					vectors.len(),
					outcome.chunks.len()
				),
			});
		}

		let passages = outcome
			.chunks
			.into_iter()
			.zip(vectors)
			.map(|(chunk, vector)| {
				let payload = PassagePayload {
					note_id,
					chunk_index: chunk.chunk_index,
					text: chunk.text,
					title: title.clone(),
					tags: tags.clone(),
					updated_at: updated_at.clone(),
				};

				(payload, vector)
			})
			.collect::<Vec<_>>();

		self.store.delete_note_passages(note_id).await?;

		let passage_ids = self.store.upsert_passages(&passages).await?;

		tracing::info!(
			note_id,
			passages = passage_ids.len(),
			fallback = outcome.fallback,
			"Indexed note."
		);

		Ok(IndexNoteResponse { note_id, passage_ids, fallback: outcome.fallback })
	}

	pub async fn delete_note(&self, note_id: i64) -> Result<()> {
		self.store.delete_note_passages(note_id).await?;

		tracing::info!(note_id, "Deleted note passages.");

		Ok(())
	}
}
