use otter_primitives::OtError;
use thiserror::Error;

use crate::manager::ManagerPhase;
use crate::revision::Revision;

/// Failure reported by a [`Transport`](crate::Transport).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
	/// The log could not be reached.
	#[error("transport unavailable: {0}")]
	Unavailable(String),
	/// Another actor committed after the revision the push was based on.
	#[error("push based on {base} but the log head is {head}")]
	Conflict {
		/// Revision the rejected push was based on.
		base: Revision,
		/// Current head of the log.
		head: Revision,
	},
	/// The log refused operations that do not apply to its head.
	#[error("operations rejected: {0}")]
	Rejected(String),
	/// The transport was shut down.
	#[error("transport closed")]
	Closed,
}

/// Errors surfaced by [`StateManager`](crate::StateManager).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
	/// The manager has not completed a checkout.
	#[error("state manager is not ready (phase: {0:?})")]
	NotReady(ManagerPhase),
	/// Another checkout or sync on this manager has not finished.
	#[error("a checkout or sync is already in flight")]
	SyncInFlight,
	/// The transport failed; local state is unchanged.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// An operation did not apply; local and remote state diverged.
	#[error(transparent)]
	Document(#[from] OtError),
}

impl SyncError {
	/// Returns true when retrying the same call later may succeed.
	pub fn is_transient(&self) -> bool {
		matches!(self, Self::Transport(_))
	}
}
