use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use zen_domain::{PassageEmbedding, detect_outliers};

use crate::{Error, Result, ZenService};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NoteOutliersRequest {
	pub note_id: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NoteOutliersResponse {
	pub note_id: i64,
	pub passage_count: usize,
	/// Noise passages, most unusual first. Clustered passages are omitted.
	pub outliers: Vec<OutlierItem>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutlierItem {
	pub passage_id: Uuid,
	pub chunk_index: i32,
	pub outlier_score: f32,
	pub is_outlier: bool,
	pub text: String,
}

impl ZenService {
	pub async fn note_outliers(&self, req: NoteOutliersRequest) -> Result<NoteOutliersResponse> {
		let note_id = req.note_id;
		let passages = self
			.store
			.scroll_note_passages(note_id, self.cfg.similarity.max_source_passages)
			.await?;

		if passages.is_empty() {
			return Err(Error::NotFound { message: format!("Note {note_id} has no passages.") });
		}

		let embeddings = passages
			.iter()
			.map(|passage| PassageEmbedding {
				passage_id: passage.passage_id,
				vector: passage.vector.as_deref(),
			})
			.collect::<Vec<_>>();
		let records = detect_outliers(&embeddings, &self.outlier_config());
		let by_id = passages
			.iter()
			.map(|passage| (passage.passage_id, passage))
			.collect::<HashMap<_, _>>();
		let outliers = records
			.into_iter()
			.filter_map(|record| {
				let passage = by_id.get(&record.passage_id)?;

				Some(OutlierItem {
					passage_id: record.passage_id,
					chunk_index: passage.payload.chunk_index,
					outlier_score: record.outlier_score,
					is_outlier: record.is_outlier,
					text: passage.payload.text.clone(),
				})
			})
			.collect::<Vec<_>>();

		Ok(NoteOutliersResponse { note_id, passage_count: passages.len(), outliers })
	}
}
