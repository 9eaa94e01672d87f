/// Cuts `text` to at most `limit` Unicode scalar values.
///
/// Content at or under the limit is returned unchanged; longer content is cut to exactly
/// `limit` characters with no marker appended, so the model budget is never exceeded.
pub fn truncate_chars(text: &str, limit: usize) -> &str {
	match text.char_indices().nth(limit) {
		Some((byte_idx, _)) => &text[..byte_idx],
		None => text,
	}
}

/// Same cut as [`truncate_chars`], for log snippets. Appends `...` when anything was dropped.
pub fn snippet(text: &str, limit: usize) -> String {
	let cut = truncate_chars(text, limit);

	if cut.len() == text.len() { cut.to_string() } else { format!("{cut}...") }
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn keeps_short_content() {
		assert_eq!(truncate_chars("hello", 5), "hello");
		assert_eq!(truncate_chars("", 3), "");
	}

	#[test]
	fn cuts_on_character_boundaries() {
		let text = "caf\u{e9} cr\u{e8}me";

		assert_eq!(truncate_chars(text, 4), "caf\u{e9}");
		assert_eq!(truncate_chars(text, 4).chars().count(), 4);
	}

	#[test]
	fn snippet_marks_dropped_content() {
		assert_eq!(snippet("abcdef", 3), "abc...");
		assert_eq!(snippet("abc", 3), "abc");
	}
}
