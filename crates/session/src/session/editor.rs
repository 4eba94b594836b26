use otter_primitives::{CharIdx, Operation, TextDocument};
use otter_sync::{SyncError, Transport};

use super::SyncSession;
use crate::graph::{GraphReader, NoGraph};

/// Session over a plain-text document.
pub type EditorSession<T, G = NoGraph> = SyncSession<TextDocument, T, G>;

impl<T, G> SyncSession<TextDocument, T, G>
where
	T: Transport<TextDocument> + 'static,
	G: GraphReader,
{
	/// Inserts `content` before the character at `position`.
	pub fn insert(&self, position: CharIdx, content: impl Into<String>) -> Result<(), SyncError> {
		self.apply_operations([Operation::insert(position, content)])
	}

	/// Deletes `content`, which must be the text found at `position`.
	pub fn delete(&self, position: CharIdx, content: impl Into<String>) -> Result<(), SyncError> {
		self.apply_operations([Operation::delete(position, content)])
	}

	/// Replaces `old` at `position` with `new` as one delete-then-insert batch.
	pub fn replace(&self, position: CharIdx, old: impl Into<String>, new: impl Into<String>) -> Result<(), SyncError> {
		self.apply_operations([Operation::delete(position, old), Operation::insert(position, new)])
	}

	/// Returns the optimistic text.
	pub fn text(&self) -> String {
		self.manager().get_state().to_string()
	}
}
