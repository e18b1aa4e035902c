use std::sync::LazyLock;

use regex::Regex;

static SENTENCE_END: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"[.?!]\s+").expect("Failed to compile sentence boundary regex"));

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sentence {
	pub text: String,
	/// Position in the note's sentence sequence, dense across paragraphs.
	pub index: usize,
}

/// Splits normalized text into paragraphs on newlines, then into sentences on `.`, `?` or `!`
/// followed by whitespace. The punctuation stays with the sentence it ends.
pub fn split_sentences(text: &str) -> Vec<Sentence> {
	let mut out = Vec::new();

	for paragraph in text.lines() {
		let paragraph = paragraph.trim();

		if paragraph.is_empty() {
			continue;
		}

		let mut start = 0_usize;
		let mut pieces = Vec::new();

		for boundary in SENTENCE_END.find_iter(paragraph) {
			// The terminal mark is a single ASCII byte.
			pieces.push(&paragraph[start..boundary.start() + 1]);

			start = boundary.end();
		}

		pieces.push(&paragraph[start..]);

		for piece in pieces {
			let piece = piece.trim();

			if piece.is_empty() {
				continue;
			}

			out.push(Sentence { text: piece.to_string(), index: out.len() });
		}
	}

	out
}

#[cfg(test)]
mod tests {
	use super::*;

	fn texts(text: &str) -> Vec<String> {
		split_sentences(text).into_iter().map(|s| s.text).collect()
	}

	#[test]
	fn keeps_terminal_punctuation() {
		assert_eq!(texts("One. Two? Three!"), vec!["One.", "Two?", "Three!"]);
	}

	#[test]
	fn paragraph_without_punctuation_is_one_sentence() {
		assert_eq!(texts("  a heading without a period  "), vec!["a heading without a period"]);
	}

	#[test]
	fn punctuation_without_whitespace_does_not_split() {
		assert_eq!(
			texts("Version 1.2 shipped. See e.g.this"),
			vec!["Version 1.2 shipped.", "See e.g.this"]
		);
	}

	#[test]
	fn indices_are_dense_across_paragraphs() {
		let sentences = split_sentences("First. Second.\n\n   \nThird\nFourth.");

		assert_eq!(
			sentences.iter().map(|s| (s.index, s.text.as_str())).collect::<Vec<_>>(),
			vec![(0, "First."), (1, "Second."), (2, "Third"), (3, "Fourth.")]
		);
	}

	#[test]
	fn whitespace_only_text_yields_nothing() {
		assert!(split_sentences(" \n\t\n ").is_empty());
	}

	#[test]
	fn ellipsis_splits_once() {
		assert_eq!(texts("Wait... what? Fine"), vec!["Wait...", "what?", "Fine"]);
	}
}
