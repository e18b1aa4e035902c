use std::sync::LazyLock;

use regex::Regex;

static MARKDOWN_LINK: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"!?\[([^\]\n]*)\]\([^)\n]*\)").expect("Failed to compile markdown link regex")
});
static BARE_URL: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"https?://[^\s`]+").expect("Failed to compile URL regex"));
static FENCED_CODE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"(?s)```.*?```").expect("Failed to compile fenced code regex"));
static INLINE_CODE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"`[^`\n]+`").expect("Failed to compile inline code regex"));

/// Strips markdown noise from raw note text before sentence segmentation.
///
/// Links and images keep their label, bare URLs and code are removed. Unmatched markup is left as
/// is.
pub fn normalize(raw: &str) -> String {
	let text = MARKDOWN_LINK.replace_all(raw, "$1");
	let text = BARE_URL.replace_all(&text, "");
	let text = FENCED_CODE.replace_all(&text, "");
	let text = INLINE_CODE.replace_all(&text, "");

	text.into_owned()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn unwraps_links_and_images() {
		assert_eq!(
			normalize("See [the docs](https://example.com/a) and ![a cat](cat.png)."),
			"See the docs and a cat."
		);
	}

	#[test]
	fn strips_bare_urls() {
		assert_eq!(normalize("Read https://example.com/x?y=1 later."), "Read  later.");
	}

	#[test]
	fn strips_fenced_and_inline_code() {
		let raw = "Before.\n```rust\nfn main() {}\n```\nAfter `x = 1` here.";

		assert_eq!(normalize(raw), "Before.\n\nAfter  here.");
	}

	#[test]
	fn url_inside_inline_code_keeps_surrounding_prose() {
		assert_eq!(
			normalize("Run `curl https://x.io` now. Keep this prose. Then `y` here."),
			"Run  now. Keep this prose. Then  here."
		);
	}

	#[test]
	fn leaves_malformed_markup_alone() {
		assert_eq!(normalize("A [dangling link( here."), "A [dangling link( here.");
	}

	#[test]
	fn url_inside_link_target_does_not_leak() {
		assert_eq!(normalize("[label](http://a.b/c)"), "label");
	}
}
