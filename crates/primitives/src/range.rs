/// A position in the text, measured in characters (not bytes).
///
/// This is the canonical coordinate space for every text operation.
pub type CharIdx = usize;

/// A length or count in the text, measured in characters (not bytes).
///
/// This is distinct from CharIdx to avoid accidentally passing an index
/// where a length is expected or vice versa.
pub type CharLen = usize;

/// Half-open character span `[start, end)` covered by a deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
	/// First character covered.
	pub start: CharIdx,
	/// One past the last character covered.
	pub end: CharIdx,
}

impl Span {
	/// Creates a span starting at `start` covering `len` characters.
	#[inline]
	pub fn at(start: CharIdx, len: CharLen) -> Self {
		Self { start, end: start + len }
	}

	/// Returns the number of characters covered.
	#[inline]
	pub fn len(&self) -> CharLen {
		self.end - self.start
	}

	/// Returns true if the span covers nothing.
	#[inline]
	pub fn is_empty(&self) -> bool {
		self.start == self.end
	}

	/// Returns true if `pos` lies strictly between the span's ends.
	#[inline]
	pub fn strictly_contains(&self, pos: CharIdx) -> bool {
		self.start < pos && pos < self.end
	}

	/// Returns the overlapping part of two spans, if any.
	pub fn intersect(&self, other: &Span) -> Option<Span> {
		let start = self.start.max(other.start);
		let end = self.end.min(other.end);
		(start < end).then_some(Span { start, end })
	}
}

/// Counts the characters in `text`.
#[inline]
pub(crate) fn char_len(text: &str) -> CharLen {
	text.chars().count()
}

/// Returns the characters of `text` in `[from, to)`, by character index.
pub(crate) fn char_slice(text: &str, from: CharIdx, to: CharIdx) -> String {
	text.chars().skip(from).take(to.saturating_sub(from)).collect()
}

/// Returns `text` with the characters in `[from, to)` removed.
pub(crate) fn char_remove(text: &str, from: CharIdx, to: CharIdx) -> String {
	text.chars()
		.enumerate()
		.filter(|(i, _)| *i < from || *i >= to)
		.map(|(_, c)| c)
		.collect()
}

/// Returns `text` with `insert` spliced in at character index `at`.
pub(crate) fn char_splice(text: &str, at: CharIdx, insert: &str) -> String {
	let mut out = String::with_capacity(text.len() + insert.len());
	out.extend(text.chars().take(at));
	out.push_str(insert);
	out.extend(text.chars().skip(at));
	out
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn span_intersection() {
		let a = Span::at(2, 4);
		assert_eq!(a.intersect(&Span::at(4, 10)), Some(Span { start: 4, end: 6 }));
		assert_eq!(a.intersect(&Span::at(6, 1)), None);
		assert!(a.strictly_contains(3));
		assert!(!a.strictly_contains(2));
		assert!(!a.strictly_contains(6));
	}

	#[test]
	fn char_helpers_count_scalars_not_bytes() {
		assert_eq!(char_len("héllo"), 5);
		assert_eq!(char_slice("héllo", 1, 3), "él");
		assert_eq!(char_remove("héllo", 1, 3), "hlo");
		assert_eq!(char_splice("héllo", 2, "XY"), "héXYllo");
	}
}
