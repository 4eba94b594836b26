use otter_primitives::{ChatDocument, ChatMessage, Operation};
use otter_sync::{SyncError, Transport};

use super::SyncSession;
use crate::graph::{GraphReader, NoGraph};

/// Session over a chat room.
pub type ChatSession<T, G = NoGraph> = SyncSession<ChatDocument, T, G>;

impl<T, G> SyncSession<ChatDocument, T, G>
where
	T: Transport<ChatDocument> + 'static,
	G: GraphReader,
{
	/// Adds `message` to the room.
	pub fn send_message(&self, message: ChatMessage) -> Result<(), SyncError> {
		self.apply_operations([Operation::add_message(message)])
	}

	/// Removes `message` from the room. Removing an absent message is a no-op.
	pub fn delete_message(&self, message: ChatMessage) -> Result<(), SyncError> {
		self.apply_operations([Operation::remove_message(message)])
	}

	/// Returns the room's messages ordered by timestamp.
	pub fn messages(&self) -> Vec<ChatMessage> {
		self.manager().get_state().messages().into_iter().cloned().collect()
	}
}
