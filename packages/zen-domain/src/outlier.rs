//! Density-based outlier scoring for the passages of a single note.
//!
//! Passages are clustered with DBSCAN over cosine distance. A passage that ends up in no dense
//! neighborhood is noise, and its score is the mean cosine distance to every other passage of the
//! note rather than to its nearest cluster.

use std::collections::HashSet;

use serde::Serialize;
use uuid::Uuid;

use crate::vector;

#[derive(Clone, Debug)]
pub struct OutlierConfig {
	/// Neighborhood radius in cosine distance.
	pub eps: f32,
	/// Neighborhood size, the point itself included, that makes a point a core point.
	pub min_samples: usize,
	/// Minimum number of passages, and of passages with vectors, before anything is scored.
	pub min_passages: usize,
	pub score_threshold: f32,
}
impl Default for OutlierConfig {
	fn default() -> Self {
		Self { eps: 0.3, min_samples: 3, min_passages: 5, score_threshold: 0.5 }
	}
}

#[derive(Clone, Copy, Debug)]
pub struct PassageEmbedding<'a> {
	pub passage_id: Uuid,
	pub vector: Option<&'a [f32]>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OutlierRecord {
	pub passage_id: Uuid,
	pub outlier_score: f32,
	pub is_outlier: bool,
}

/// Scores the noise passages of a note, most unusual first.
///
/// Passages that belong to a dense cluster are not returned. Too few passages is not an error and
/// yields an empty result.
pub fn detect_outliers(
	passages: &[PassageEmbedding<'_>],
	cfg: &OutlierConfig,
) -> Vec<OutlierRecord> {
	if passages.len() < cfg.min_passages {
		tracing::debug!(
			passages = passages.len(),
			min_passages = cfg.min_passages,
			"Too few passages for outlier detection."
		);

		return Vec::new();
	}

	let usable: Vec<(Uuid, &[f32])> = passages
		.iter()
		.filter_map(|passage| match passage.vector {
			Some(vector) if !vector.is_empty() => Some((passage.passage_id, vector)),
			_ => None,
		})
		.collect();

	if usable.len() < cfg.min_passages {
		tracing::debug!(
			passages = passages.len(),
			with_vectors = usable.len(),
			min_passages = cfg.min_passages,
			"Too few passage vectors for outlier detection."
		);

		return Vec::new();
	}

	let distances = distance_matrix(&usable);
	let labels = dbscan(&distances, cfg.eps, cfg.min_samples);
	let others = (usable.len() - 1) as f32;
	let mut records = Vec::new();

	for (idx, label) in labels.iter().enumerate() {
		if label.is_some() {
			continue;
		}

		let total: f32 =
			distances[idx].iter().enumerate().filter(|(j, _)| *j != idx).map(|(_, d)| *d).sum();
		let outlier_score = total / others;

		records.push(OutlierRecord {
			passage_id: usable[idx].0,
			outlier_score,
			is_outlier: outlier_score >= cfg.score_threshold,
		});
	}

	records.sort_by(|a, b| b.outlier_score.total_cmp(&a.outlier_score));

	tracing::debug!(
		passages = usable.len(),
		noise = records.len(),
		flagged = records.iter().filter(|record| record.is_outlier).count(),
		"Outlier detection finished."
	);

	records
}

/// Ids of the records that cross the outlier threshold.
pub fn outlier_ids(records: &[OutlierRecord]) -> HashSet<Uuid> {
	records.iter().filter(|record| record.is_outlier).map(|record| record.passage_id).collect()
}

fn distance_matrix(points: &[(Uuid, &[f32])]) -> Vec<Vec<f32>> {
	let n = points.len();
	let mut out = vec![vec![0.0_f32; n]; n];

	for i in 0..n {
		for j in (i + 1)..n {
			let d = vector::cosine_distance(points[i].1, points[j].1);

			out[i][j] = d;
			out[j][i] = d;
		}
	}

	out
}

/// Labels each point with its cluster, or `None` for noise. Deterministic for a fixed input order.
fn dbscan(distances: &[Vec<f32>], eps: f32, min_samples: usize) -> Vec<Option<usize>> {
	let n = distances.len();
	let neighborhoods: Vec<Vec<usize>> = (0..n)
		.map(|i| (0..n).filter(|&j| i == j || distances[i][j] <= eps).collect())
		.collect();
	let is_core: Vec<bool> =
		neighborhoods.iter().map(|neighbors| neighbors.len() >= min_samples).collect();
	let mut labels = vec![None; n];
	let mut next_cluster = 0_usize;

	for seed in 0..n {
		if labels[seed].is_some() || !is_core[seed] {
			continue;
		}

		labels[seed] = Some(next_cluster);

		let mut frontier = vec![seed];

		while let Some(point) = frontier.pop() {
			// Border points join the cluster but do not extend it.
			if !is_core[point] {
				continue;
			}

			for &neighbor in &neighborhoods[point] {
				if labels[neighbor].is_none() {
					labels[neighbor] = Some(next_cluster);

					frontier.push(neighbor);
				}
			}
		}

		next_cluster += 1;
	}

	labels
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn dbscan_marks_isolated_point_as_noise() {
		let distances = vec![
			vec![0.0, 0.1, 0.1, 0.9],
			vec![0.1, 0.0, 0.1, 0.9],
			vec![0.1, 0.1, 0.0, 0.9],
			vec![0.9, 0.9, 0.9, 0.0],
		];
		let labels = dbscan(&distances, 0.3, 3);

		assert_eq!(labels, vec![Some(0), Some(0), Some(0), None]);
	}

	#[test]
	fn dbscan_attaches_border_points_without_expanding() {
		// 0..=3 are core; 4 is only within eps of 3 and 5 is only within eps of 4.
		let distances = vec![
			vec![0.0, 0.1, 0.1, 0.1, 0.9, 0.9],
			vec![0.1, 0.0, 0.1, 0.1, 0.9, 0.9],
			vec![0.1, 0.1, 0.0, 0.1, 0.9, 0.9],
			vec![0.1, 0.1, 0.1, 0.0, 0.2, 0.9],
			vec![0.9, 0.9, 0.9, 0.2, 0.0, 0.2],
			vec![0.9, 0.9, 0.9, 0.9, 0.2, 0.0],
		];
		let labels = dbscan(&distances, 0.3, 4);

		assert_eq!(labels, vec![Some(0), Some(0), Some(0), Some(0), Some(0), None]);
	}

	#[test]
	fn dbscan_separates_two_dense_groups() {
		let distances = vec![
			vec![0.0, 0.1, 0.1, 0.9, 0.9, 0.9],
			vec![0.1, 0.0, 0.1, 0.9, 0.9, 0.9],
			vec![0.1, 0.1, 0.0, 0.9, 0.9, 0.9],
			vec![0.9, 0.9, 0.9, 0.0, 0.1, 0.1],
			vec![0.9, 0.9, 0.9, 0.1, 0.0, 0.1],
			vec![0.9, 0.9, 0.9, 0.1, 0.1, 0.0],
		];
		let labels = dbscan(&distances, 0.3, 3);

		assert_eq!(labels, vec![Some(0), Some(0), Some(0), Some(1), Some(1), Some(1)]);
	}
}
