use std::collections::BTreeMap;

use serde_json::json;

use super::Document;
use crate::error::OtError;
use crate::operation::{ChatMessage, Operation};

/// Canonical encoding of a chat message record.
///
/// The key is the JSON encoding of the added record `{message, remove: false}`.
/// Adds and removes of the same logical message share it, so the set can never
/// hold both representations of one message.
pub fn canonical_key(message: &ChatMessage) -> String {
	json!({
		"message": {
			"timestamp": message.timestamp,
			"author": message.author,
			"content": message.content,
		},
		"remove": false,
	})
	.to_string()
}

/// Unordered set of chat messages keyed by [`canonical_key`].
///
/// Replaying an operation twice in a row is idempotent because the container
/// is a set: a duplicate add re-inserts the same key, a duplicate remove
/// finds nothing to remove.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatDocument {
	records: BTreeMap<String, ChatMessage>,
}

impl ChatDocument {
	/// Creates an empty chat.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the number of messages.
	pub fn len(&self) -> usize {
		self.records.len()
	}

	/// Returns true if the chat holds no messages.
	pub fn is_empty(&self) -> bool {
		self.records.is_empty()
	}

	/// Returns true if `message` is present.
	pub fn contains(&self, message: &ChatMessage) -> bool {
		self.records.contains_key(&canonical_key(message))
	}

	/// Iterates over canonical keys in key order.
	pub fn keys(&self) -> impl Iterator<Item = &str> {
		self.records.keys().map(String::as_str)
	}

	/// Returns the messages ordered by timestamp, then author and content.
	pub fn messages(&self) -> Vec<&ChatMessage> {
		let mut messages: Vec<_> = self.records.values().collect();
		messages.sort();
		messages
	}
}

impl FromIterator<ChatMessage> for ChatDocument {
	fn from_iter<I: IntoIterator<Item = ChatMessage>>(iter: I) -> Self {
		Self {
			records: iter
				.into_iter()
				.filter(|m| !m.is_empty())
				.map(|m| (canonical_key(&m), m))
				.collect(),
		}
	}
}

impl Document for ChatDocument {
	const KIND: &'static str = "chat";

	fn apply(&mut self, op: &Operation) -> Result<(), OtError> {
		if op.is_empty() {
			return Ok(());
		}

		match op {
			Operation::Message { message, remove } => {
				let key = canonical_key(message);
				if *remove {
					self.records.remove(&key);
				} else {
					self.records.insert(key, message.clone());
				}
				Ok(())
			}
			Operation::Insert { .. } | Operation::Delete { .. } => Err(OtError::Unsupported {
				op: op.kind(),
				document: Self::KIND,
			}),
		}
	}
}
