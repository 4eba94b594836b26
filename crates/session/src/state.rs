use otter_sync::Revision;

/// Lifecycle phase of a [`SyncSession`](crate::SyncSession).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SessionPhase {
	/// Not started.
	#[default]
	Idle,
	/// Checking the document out, possibly between retries.
	CheckingOut,
	/// Checked out; the sync ticker is running.
	Ready,
	/// Stopped by the owner.
	Stopped,
	/// Checkout retries were exhausted.
	Failed,
}

/// UI-agnostic state republished by a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState<D, G> {
	/// Optimistic document, pending local edits included.
	pub content: D,
	/// Last confirmed revision.
	pub revision: Revision,
	/// Set once the first checkout succeeded.
	pub ready: bool,
	/// Current lifecycle phase.
	pub phase: SessionPhase,
	/// Latest graph read whose revision was still current when it completed.
	pub commits_graph: Option<G>,
	/// Last integrity or checkout failure, if any.
	pub fault: Option<String>,
}

impl<D: Default, G> Default for SessionState<D, G> {
	fn default() -> Self {
		Self {
			content: D::default(),
			revision: Revision::ZERO,
			ready: false,
			phase: SessionPhase::Idle,
			commits_graph: None,
			fault: None,
		}
	}
}
