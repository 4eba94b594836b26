use serde::{Deserialize, Serialize};

/// A chat message record.
///
/// Two messages are the same logical message iff all fields are equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChatMessage {
	/// Milliseconds since the Unix epoch at which the author sent it.
	pub timestamp: u64,
	/// Author display name or identifier.
	pub author: String,
	/// Message body.
	pub content: String,
}

impl ChatMessage {
	/// The message whose operations are no-ops.
	pub const EMPTY: ChatMessage = ChatMessage {
		timestamp: 0,
		author: String::new(),
		content: String::new(),
	};

	/// Creates a message.
	pub fn new(timestamp: u64, author: impl Into<String>, content: impl Into<String>) -> Self {
		Self {
			timestamp,
			author: author.into(),
			content: content.into(),
		}
	}

	/// Returns true if the message carries neither author nor content.
	pub fn is_empty(&self) -> bool {
		self.author.is_empty() && self.content.is_empty()
	}
}
