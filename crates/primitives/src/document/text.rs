use std::fmt;

use ropey::Rope;

use super::Document;
use crate::error::OtError;
use crate::operation::Operation;
use crate::range::{CharLen, char_len};

/// Ordered character sequence edited by insertions and deletions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextDocument {
	text: Rope,
}

impl TextDocument {
	/// Creates an empty document.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the length in characters.
	pub fn len_chars(&self) -> CharLen {
		self.text.len_chars()
	}

	/// Returns true if the document holds no characters.
	pub fn is_empty(&self) -> bool {
		self.text.len_chars() == 0
	}

	/// Returns the underlying rope.
	pub fn rope(&self) -> &Rope {
		&self.text
	}
}

impl From<&str> for TextDocument {
	fn from(text: &str) -> Self {
		Self { text: Rope::from_str(text) }
	}
}

impl From<Rope> for TextDocument {
	fn from(text: Rope) -> Self {
		Self { text }
	}
}

impl fmt::Display for TextDocument {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for chunk in self.text.chunks() {
			f.write_str(chunk)?;
		}
		Ok(())
	}
}

impl PartialEq<&str> for TextDocument {
	fn eq(&self, other: &&str) -> bool {
		self.text == *other
	}
}

impl Document for TextDocument {
	const KIND: &'static str = "text";

	fn apply(&mut self, op: &Operation) -> Result<(), OtError> {
		if op.is_empty() {
			return Ok(());
		}

		let len = self.text.len_chars();
		match op {
			Operation::Insert { position, content } => {
				if *position > len {
					return Err(OtError::OutOfRange { position: *position, len });
				}
				self.text.insert(*position, content);
				Ok(())
			}
			Operation::Delete { position, content } => {
				let end = position.saturating_add(char_len(content));
				if end > len {
					return Err(OtError::OutOfRange { position: *position, len });
				}
				let found = self.text.slice(*position..end);
				if found != content.as_str() {
					return Err(OtError::ContentMismatch {
						position: *position,
						expected: content.clone(),
						found: found.to_string(),
					});
				}
				self.text.remove(*position..end);
				Ok(())
			}
			Operation::Message { .. } => Err(OtError::Unsupported {
				op: op.kind(),
				document: Self::KIND,
			}),
		}
	}
}
