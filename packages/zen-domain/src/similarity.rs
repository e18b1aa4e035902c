//! Cross-note evidence aggregation for similar-note discovery.
//!
//! Every passage of the source note issues one neighbor query. Matches owned by the source note
//! are discarded, the rest are tallied per candidate note, and the candidates are ranked by a
//! weighted match count in which outlier-sourced evidence counts more than routine evidence.

use std::{cmp::Ordering, collections::HashMap};

use serde::Serialize;

pub const DEFAULT_OUTLIER_WEIGHT: u32 = 3;

#[derive(Clone, Debug)]
pub struct NoteMatch<P> {
	pub note_id: i64,
	pub score: f32,
	pub payload: P,
}

#[derive(Clone, Debug)]
pub struct NoteMatchAccumulator<P> {
	pub max_score: f32,
	pub outlier_match_count: u32,
	pub routine_match_count: u32,
	/// Payload of the highest-scoring match seen so far.
	pub best_payload: Option<P>,
}
impl<P> Default for NoteMatchAccumulator<P> {
	fn default() -> Self {
		Self { max_score: 0.0, outlier_match_count: 0, routine_match_count: 0, best_payload: None }
	}
}
impl<P> NoteMatchAccumulator<P> {
	pub fn record(&mut self, score: f32, payload: P, from_outlier: bool) {
		if from_outlier {
			self.outlier_match_count += 1;
		} else {
			self.routine_match_count += 1;
		}

		if score > self.max_score {
			self.max_score = score;
			self.best_payload = Some(payload);
		}
	}

	pub fn merge(&mut self, other: Self) {
		self.outlier_match_count += other.outlier_match_count;
		self.routine_match_count += other.routine_match_count;

		if other.max_score > self.max_score {
			self.max_score = other.max_score;
			self.best_payload = other.best_payload;
		}
	}

	pub fn weighted_score(&self, outlier_weight: u32) -> u32 {
		self.outlier_match_count
			.saturating_mul(outlier_weight)
			.saturating_add(self.routine_match_count)
	}
}

#[derive(Clone, Debug, Serialize)]
pub struct RankedNote<P> {
	pub note_id: i64,
	pub max_score: f32,
	pub outlier_match_count: u32,
	pub routine_match_count: u32,
	pub weighted_score: u32,
	pub payload: P,
}

/// Per-request tally of candidate notes. Lives for a single similarity lookup.
#[derive(Clone, Debug)]
pub struct SimilarityTally<P> {
	source_note_id: i64,
	outlier_weight: u32,
	notes: HashMap<i64, NoteMatchAccumulator<P>>,
}
impl<P> SimilarityTally<P> {
	pub fn new(source_note_id: i64) -> Self {
		Self { source_note_id, outlier_weight: DEFAULT_OUTLIER_WEIGHT, notes: HashMap::new() }
	}

	pub fn with_outlier_weight(mut self, outlier_weight: u32) -> Self {
		self.outlier_weight = outlier_weight;

		self
	}

	pub fn candidate_count(&self) -> usize {
		self.notes.len()
	}

	/// Records the neighbor matches of one source passage and returns how many counted.
	pub fn record_passage<I>(&mut self, from_outlier: bool, matches: I) -> usize
	where
		I: IntoIterator<Item = NoteMatch<P>>,
	{
		let mut counted = 0;

		for m in matches {
			if m.note_id == self.source_note_id {
				continue;
			}

			self.notes.entry(m.note_id).or_default().record(m.score, m.payload, from_outlier);

			counted += 1;
		}

		counted
	}

	/// Folds a partial tally built for the same source note into this one.
	pub fn merge(&mut self, other: Self) {
		debug_assert_eq!(self.source_note_id, other.source_note_id);

		for (note_id, acc) in other.notes {
			match self.notes.get_mut(&note_id) {
				Some(existing) => existing.merge(acc),
				None => {
					self.notes.insert(note_id, acc);
				},
			}
		}
	}

	/// Ranks candidates by `(weighted_score, max_score)` descending and keeps the first `limit`.
	///
	/// Candidates that never captured a payload are dropped.
	pub fn rank(self, limit: usize) -> Vec<RankedNote<P>> {
		let outlier_weight = self.outlier_weight;
		let mut ranked: Vec<RankedNote<P>> = self
			.notes
			.into_iter()
			.filter_map(|(note_id, acc)| {
				let weighted_score = acc.weighted_score(outlier_weight);
				let payload = acc.best_payload?;

				Some(RankedNote {
					note_id,
					max_score: acc.max_score,
					outlier_match_count: acc.outlier_match_count,
					routine_match_count: acc.routine_match_count,
					weighted_score,
					payload,
				})
			})
			.collect();

		ranked.sort_by(compare_ranked);
		ranked.truncate(limit);

		ranked
	}
}

fn compare_ranked<P>(a: &RankedNote<P>, b: &RankedNote<P>) -> Ordering {
	b.weighted_score
		.cmp(&a.weighted_score)
		.then_with(|| b.max_score.total_cmp(&a.max_score))
		.then_with(|| a.note_id.cmp(&b.note_id))
}
