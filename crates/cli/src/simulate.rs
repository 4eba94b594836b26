use std::time::Duration;

use otter_primitives::{ChatMessage, Document, Operation, TextDocument};
use otter_session::SyncSession;
use otter_sync::MemoryLog;

const WORDS: [&str; 8] = ["otter ", "river ", "stone ", "kelp ", "shell ", "tide ", "den ", "fish "];

/// Deterministic edit generator (xorshift64*).
pub struct Script {
	state: u64,
}

impl Script {
	pub fn new(seed: u64) -> Self {
		Self {
			state: seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1,
		}
	}

	fn next(&mut self) -> u64 {
		self.state ^= self.state >> 12;
		self.state ^= self.state << 25;
		self.state ^= self.state >> 27;
		self.state.wrapping_mul(0x2545_F491_4F6C_DD1D)
	}

	fn below(&mut self, bound: usize) -> usize {
		(self.next() % bound.max(1) as u64) as usize
	}

	/// Picks an insertion, deletion or replacement valid against `doc`.
	pub fn text_edit(&mut self, doc: &TextDocument, actor: usize, step: usize) -> Vec<Operation> {
		let len = doc.len_chars();
		let roll = self.below(10);
		if len > 4 && roll < 3 {
			let position = self.below(len - 1);
			let count = 1 + self.below((len - position).min(4));
			let removed = doc.rope().slice(position..position + count).to_string();
			if roll == 0 {
				let word = WORDS[self.below(WORDS.len())];
				return vec![Operation::delete(position, removed), Operation::insert(position, word)];
			}
			return vec![Operation::delete(position, removed)];
		}
		let position = self.below(len + 1);
		let word = WORDS[(actor + step) % WORDS.len()];
		vec![Operation::insert(position, word)]
	}

	/// Sends a message, sometimes retracting one of the actor's earlier ones.
	pub fn chat_edit(&mut self, actor: usize, step: usize, actors: usize) -> Vec<Operation> {
		let message = |step: usize| ChatMessage::new((step * actors + actor) as u64, format!("actor{actor}"), format!("message {step}"));
		let mut ops = vec![Operation::add_message(message(step))];
		if step > 0 && self.below(4) == 0 {
			ops.push(Operation::remove_message(message(self.below(step))));
		}
		ops
	}
}

/// Resolves once every session has pushed its edits and caught up with the log head.
pub async fn settle<D: Document>(sessions: &[SyncSession<D, MemoryLog<D>, MemoryLog<D>>], log: &MemoryLog<D>) {
	loop {
		let head = log.revision();
		let settled = sessions
			.iter()
			.all(|session| session.manager().pending_len() == 0 && session.manager().get_revision() == head);
		if settled {
			return;
		}
		let interval = sessions.first().map_or(Duration::from_millis(100), |session| session.config().sync_interval());
		tokio::time::sleep(interval).await;
	}
}
