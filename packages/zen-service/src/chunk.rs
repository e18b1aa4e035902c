use serde::{Deserialize, Serialize};

use zen_chunking::{Chunk, chunk_sentences, normalize, split_sentences};

use crate::{Result, ZenService};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChunkRequest {
	pub text: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChunkResponse {
	pub passages: Vec<PassageItem>,
	/// Set when semantic splitting failed and the whole text became one passage.
	pub fallback: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PassageItem {
	pub chunk_index: i32,
	pub sentence_count: usize,
	pub text: String,
}
impl From<Chunk> for PassageItem {
	fn from(chunk: Chunk) -> Self {
		let Chunk { chunk_index, sentence_count, text } = chunk;

		Self { chunk_index, sentence_count, text }
	}
}

pub(crate) struct ChunkOutcome {
	pub(crate) chunks: Vec<Chunk>,
	pub(crate) fallback: bool,
}

impl ZenService {
	pub async fn chunk(&self, req: ChunkRequest) -> Result<ChunkResponse> {
		let outcome = self.chunk_text(&req.text).await;

		Ok(ChunkResponse {
			passages: outcome.chunks.into_iter().map(PassageItem::from).collect(),
			fallback: outcome.fallback,
		})
	}

	/// Normalizes, segments and semantically chunks `raw`.
	///
	/// Never fails. When the sentence embeddings cannot be obtained or do not line up with the
	/// sentences, the whole normalized text becomes a single passage.
	pub(crate) async fn chunk_text(&self, raw: &str) -> ChunkOutcome {
		let normalized = normalize(raw);
		let text = normalized.trim();

		if text.is_empty() {
			return ChunkOutcome { chunks: Vec::new(), fallback: false };
		}

		let sentences = split_sentences(text);
		let cfg = self.chunking_config();

		if sentences.len() <= 1 {
			return match chunk_sentences(&sentences, &[], &cfg) {
				Ok(chunks) => ChunkOutcome { chunks, fallback: false },
				Err(err) => fallback(text, sentences.len(), &err.to_string()),
			};
		}

		let texts = sentences.iter().map(|sentence| sentence.text.clone()).collect::<Vec<_>>();
		let embeddings =
			match self.embedding.embed_texts(&self.cfg.providers.text_embedding, &texts).await {
				Ok(embeddings) => embeddings,
				Err(err) => return fallback(text, sentences.len(), &err.to_string()),
			};

		match chunk_sentences(&sentences, &embeddings, &cfg) {
			Ok(chunks) => {
				tracing::debug!(
					sentences = sentences.len(),
					passages = chunks.len(),
					"Chunked note text."
				);

				ChunkOutcome { chunks, fallback: false }
			},
			Err(err) => fallback(text, sentences.len(), &err.to_string()),
		}
	}
}

fn fallback(text: &str, sentence_count: usize, reason: &str) -> ChunkOutcome {
	tracing::warn!(
		sentences = sentence_count,
		error = reason,
		"Semantic chunking failed. Keeping the whole text as one passage."
	);

	ChunkOutcome { chunks: vec![Chunk::whole(text, sentence_count)], fallback: true }
}
