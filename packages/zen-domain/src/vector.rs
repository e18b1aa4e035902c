/// Cosine similarity of two embeddings.
///
/// Returns `0.0` instead of failing when the lengths differ, either vector is empty, or either
/// vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
	if a.len() != b.len() || a.is_empty() {
		return 0.0;
	}

	let mut dot = 0.0_f64;
	let mut norm_a = 0.0_f64;
	let mut norm_b = 0.0_f64;

	for (x, y) in a.iter().zip(b.iter()) {
		let (x, y) = (*x as f64, *y as f64);

		dot += x * y;
		norm_a += x * x;
		norm_b += y * y;
	}

	if norm_a == 0.0 || norm_b == 0.0 {
		return 0.0;
	}

	let sim = dot / (norm_a.sqrt() * norm_b.sqrt());

	if !sim.is_finite() {
		return 0.0;
	}

	sim.clamp(-1.0, 1.0) as f32
}

/// `1 - cosine_similarity`, in `[0, 2]`.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
	1.0 - cosine_similarity(a, b)
}
