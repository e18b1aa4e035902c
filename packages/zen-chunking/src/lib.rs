mod error;
mod normalize;
mod sentence;

pub use error::{Error, Result};
pub use normalize::normalize;
pub use sentence::{Sentence, split_sentences};

#[derive(Clone, Debug)]
pub struct ChunkingConfig {
	/// Adjacent sentences below this cosine similarity request a boundary.
	pub break_threshold: f32,
	pub min_sentences: usize,
	pub max_sentences: usize,
}
impl Default for ChunkingConfig {
	fn default() -> Self {
		Self { break_threshold: 0.5, min_sentences: 2, max_sentences: 10 }
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct Chunk {
	pub chunk_index: i32,
	pub sentence_count: usize,
	pub text: String,
}
impl Chunk {
	/// A single passage holding all of `text`, used when semantic splitting is unavailable.
	pub fn whole(text: &str, sentence_count: usize) -> Self {
		Self {
			chunk_index: 0,
			sentence_count: sentence_count.max(1),
			text: text.trim().to_string(),
		}
	}
}

/// Groups sentences into passages by scanning once and closing the pending buffer on a size,
/// similarity or end-of-note boundary.
///
/// `embeddings[i]` belongs to `sentences[i]`. They are not consulted when there is at most one
/// sentence. While the buffer is below `min_sentences` a similarity drop is ignored, and an
/// undersized tail is appended to the previous passage.
pub fn chunk_sentences(
	sentences: &[Sentence],
	embeddings: &[Vec<f32>],
	cfg: &ChunkingConfig,
) -> Result<Vec<Chunk>> {
	match sentences {
		[] => return Ok(Vec::new()),
		[only] => return Ok(vec![Chunk::whole(&only.text, 1)]),
		_ => {},
	}

	if embeddings.len() != sentences.len() {
		return Err(Error::EmbeddingCountMismatch {
			expected: sentences.len(),
			actual: embeddings.len(),
		});
	}

	let last = sentences.len() - 1;
	let mut chunks = Vec::new();
	let mut buffer: Vec<&str> = Vec::new();

	for (i, sentence) in sentences.iter().enumerate() {
		buffer.push(sentence.text.as_str());

		let is_last = i == last;
		let size_break = buffer.len() >= cfg.max_sentences;
		let similarity_break = !is_last
			&& zen_domain::cosine_similarity(&embeddings[i], &embeddings[i + 1])
				< cfg.break_threshold;

		if !(size_break || similarity_break || is_last) {
			continue;
		}

		if buffer.len() >= cfg.min_sentences {
			emit(&mut chunks, &mut buffer);
		} else if is_last {
			absorb_tail(&mut chunks, &mut buffer);
		}
	}

	if !buffer.is_empty() {
		if buffer.len() >= cfg.min_sentences {
			emit(&mut chunks, &mut buffer);
		} else {
			absorb_tail(&mut chunks, &mut buffer);
		}
	}

	tracing::debug!(
		sentences = sentences.len(),
		chunks = chunks.len(),
		"Semantic chunking finished."
	);

	Ok(chunks)
}

fn emit(chunks: &mut Vec<Chunk>, buffer: &mut Vec<&str>) {
	chunks.push(Chunk {
		chunk_index: chunks.len() as i32,
		sentence_count: buffer.len(),
		text: buffer.join(" ").trim().to_string(),
	});

	buffer.clear();
}

fn absorb_tail(chunks: &mut Vec<Chunk>, buffer: &mut Vec<&str>) {
	let tail = buffer.join(" ");
	let tail = tail.trim();

	match chunks.last_mut() {
		Some(previous) => {
			previous.text.push(' ');
			previous.text.push_str(tail);
			previous.sentence_count += buffer.len();
		},
		None => chunks.push(Chunk {
			chunk_index: 0,
			sentence_count: buffer.len(),
			text: tail.to_string(),
		}),
	}

	buffer.clear();
}
