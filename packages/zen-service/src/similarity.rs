use serde::{Deserialize, Serialize};

use zen_domain::{
	NoteMatch, PassageEmbedding, RankedNote, SimilarityTally, detect_outliers, outlier_ids,
};
use zen_storage::models::PassagePayload;

use crate::{
	Result, ZenService,
	search::{resolve_limit, resolve_threshold},
};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimilarNotesRequest {
	pub note_id: i64,
	pub limit: Option<u32>,
	pub score_threshold: Option<f32>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimilarNotesResponse {
	pub note_id: i64,
	pub source_passages: usize,
	pub outlier_passages: usize,
	pub items: Vec<SimilarNoteItem>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimilarNoteItem {
	pub note_id: i64,
	pub max_score: f32,
	pub outlier_match_count: u32,
	pub routine_match_count: u32,
	pub weighted_score: u32,
	pub title: String,
	pub tags: Vec<String>,
	pub updated_at: String,
}
impl From<RankedNote<PassagePayload>> for SimilarNoteItem {
	fn from(ranked: RankedNote<PassagePayload>) -> Self {
		Self {
			note_id: ranked.note_id,
			max_score: ranked.max_score,
			outlier_match_count: ranked.outlier_match_count,
			routine_match_count: ranked.routine_match_count,
			weighted_score: ranked.weighted_score,
			title: ranked.payload.title,
			tags: ranked.payload.tags,
			updated_at: ranked.payload.updated_at,
		}
	}
}

impl ZenService {
	/// Notes related to `note_id`, ranked by outlier-weighted passage evidence.
	///
	/// Every stored passage of the source note issues one neighbor query for
	/// `limit * overfetch_factor` candidates. The source note never appears in the result.
	pub async fn find_similar_notes(
		&self,
		req: SimilarNotesRequest,
	) -> Result<SimilarNotesResponse> {
		let note_id = req.note_id;
		let limit = resolve_limit(req.limit, self.cfg.similarity.default_limit)?;
		let threshold =
			resolve_threshold(req.score_threshold, self.cfg.similarity.default_threshold)?;
		let passages = self
			.store
			.scroll_note_passages(note_id, self.cfg.similarity.max_source_passages)
			.await?;

		if passages.is_empty() {
			tracing::warn!(note_id, "Source note has no stored passages.");

			return Ok(SimilarNotesResponse {
				note_id,
				source_passages: 0,
				outlier_passages: 0,
				items: Vec::new(),
			});
		}

		let embeddings = passages
			.iter()
			.map(|passage| PassageEmbedding {
				passage_id: passage.passage_id,
				vector: passage.vector.as_deref(),
			})
			.collect::<Vec<_>>();
		let outliers = outlier_ids(&detect_outliers(&embeddings, &self.outlier_config()));
		let candidate_limit = limit.saturating_mul(self.cfg.similarity.overfetch_factor);
		let mut tally = SimilarityTally::new(note_id)
			.with_outlier_weight(self.cfg.similarity.outlier_weight);

		for passage in &passages {
			let Some(vector) = passage.vector.as_deref() else {
				tracing::warn!(
					note_id,
					passage_id = %passage.passage_id,
					"Skipping passage without an embedding."
				);

				continue;
			};
			let from_outlier = outliers.contains(&passage.passage_id);
			let hits = self.store.search_passages(vector, candidate_limit, threshold).await?;
			let hit_count = hits.len();
			let counted = tally.record_passage(
				from_outlier,
				hits.into_iter().map(|hit| NoteMatch {
					note_id: hit.payload.note_id,
					score: hit.score,
					payload: hit.payload,
				}),
			);

			tracing::debug!(
				note_id,
				passage_id = %passage.passage_id,
				from_outlier,
				hits = hit_count,
				counted,
				"Tallied passage matches."
			);
		}

		let candidates = tally.candidate_count();
		let items = tally
			.rank(limit as usize)
			.into_iter()
			.map(SimilarNoteItem::from)
			.collect::<Vec<_>>();

		tracing::info!(
			note_id,
			passages = passages.len(),
			outliers = outliers.len(),
			candidates,
			results = items.len(),
			"Similar note lookup finished."
		);

		Ok(SimilarNotesResponse {
			note_id,
			source_passages: passages.len(),
			outlier_passages: outliers.len(),
			items,
		})
	}
}
