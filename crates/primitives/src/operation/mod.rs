mod message;


pub use message::ChatMessage;
use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::error::OtError;
use crate::range::{CharIdx, CharLen, Span, char_len};

/// One atomic edit of a document.
///
/// Operations are immutable values compared structurally. Text operations
/// carry the affected characters so that every operation is invertible
/// without consulting the document it was applied to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
	/// Insert `content` before the character at `position`.
	Insert {
		/// Character index of the insertion point.
		position: CharIdx,
		/// Inserted text.
		content: String,
	},
	/// Delete `content`, which starts at `position`.
	Delete {
		/// Character index of the first deleted character.
		position: CharIdx,
		/// Deleted text, checked against the document on apply.
		content: String,
	},
	/// Add or remove one chat message.
	Message {
		/// The message record.
		message: ChatMessage,
		/// `true` removes the message, `false` adds it.
		remove: bool,
	},
}

impl Operation {
	/// Creates an insertion of `content` at `position`.
	pub fn insert(position: CharIdx, content: impl Into<String>) -> Self {
		Self::Insert {
			position,
			content: content.into(),
		}
	}

	/// Creates a deletion of `content` starting at `position`.
	pub fn delete(position: CharIdx, content: impl Into<String>) -> Self {
		Self::Delete {
			position,
			content: content.into(),
		}
	}

	/// Creates an operation adding `message` to a chat.
	pub fn add_message(message: ChatMessage) -> Self {
		Self::Message { message, remove: false }
	}

	/// Creates an operation removing `message` from a chat.
	pub fn remove_message(message: ChatMessage) -> Self {
		Self::Message { message, remove: true }
	}

	/// Returns the kind name used in diagnostics.
	pub const fn kind(&self) -> &'static str {
		match self {
			Self::Insert { .. } => "insert",
			Self::Delete { .. } => "delete",
			Self::Message { .. } => "message",
		}
	}

	/// Returns true for operations that leave every document unchanged.
	pub fn is_empty(&self) -> bool {
		match self {
			Self::Insert { content, .. } | Self::Delete { content, .. } => content.is_empty(),
			Self::Message { message, .. } => message.is_empty(),
		}
	}

	/// Returns true for insertions and deletions.
	pub const fn is_text(&self) -> bool {
		matches!(self, Self::Insert { .. } | Self::Delete { .. })
	}

	/// Returns the operation that undoes this one.
	///
	/// `apply(invert(op), apply(op, d)) == d` for every document `d` the
	/// operation was validly applied to.
	pub fn invert(&self) -> Operation {
		match self {
			Self::Insert { position, content } => Self::Delete {
				position: *position,
				content: content.clone(),
			},
			Self::Delete { position, content } => Self::Insert {
				position: *position,
				content: content.clone(),
			},
			Self::Message { message, remove } => Self::Message {
				message: message.clone(),
				remove: !remove,
			},
		}
	}

	/// Returns true if `other` is exactly the inverse of this operation.
	pub fn is_inverse_of(&self, other: &Operation) -> bool {
		match (self, other) {
			(Self::Insert { position: p1, content: c1 }, Self::Delete { position: p2, content: c2 })
			| (Self::Delete { position: p1, content: c1 }, Self::Insert { position: p2, content: c2 }) => p1 == p2 && c1 == c2,
			(Self::Message { message: m1, remove: r1 }, Self::Message { message: m2, remove: r2 }) => m1 == m2 && r1 != r2,
			_ => false,
		}
	}

	/// Applies this operation to `doc`.
	pub fn apply<D: Document>(&self, doc: &mut D) -> Result<(), OtError> {
		doc.apply(self)
	}

	/// Returns the number of characters a text operation inserts or deletes.
	///
	/// Message operations have no extent and report zero.
	pub fn char_len(&self) -> CharLen {
		match self {
			Self::Insert { content, .. } | Self::Delete { content, .. } => char_len(content),
			Self::Message { .. } => 0,
		}
	}

	/// Returns the character span a deletion covers in its base document.
	pub(crate) fn deleted_span(&self) -> Option<Span> {
		match self {
			Self::Delete { position, content } => Some(Span::at(*position, char_len(content))),
			_ => None,
		}
	}
}
