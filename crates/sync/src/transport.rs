use async_trait::async_trait;
use otter_primitives::{Document, Operation};

use crate::error::TransportError;
use crate::revision::Revision;

/// Authoritative document state at a revision.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<D> {
	/// Materialized document.
	pub document: D,
	/// Revision the document reflects.
	pub revision: Revision,
}

/// An operation committed to the log, tagged with the revision of its commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteOperation {
	/// The committed operation.
	pub operation: Operation,
	/// Revision of the commit that introduced it.
	pub revision: Revision,
}

/// Connection to a shared revision log.
///
/// Wire format and addressing belong to the implementation; the manager only
/// relies on this contract.
#[async_trait]
pub trait Transport<D: Document>: Send + Sync {
	/// Fetches the head document and its revision.
	async fn fetch_snapshot(&self) -> Result<Snapshot<D>, TransportError>;

	/// Returns operations committed after `since`, in commit order.
	async fn pull_operations(&self, since: Revision) -> Result<Vec<RemoteOperation>, TransportError>;

	/// Commits `operations` on top of `base` and returns the new revision.
	///
	/// Fails with [`TransportError::Conflict`] when `base` is not the head.
	/// Every revision must carry at least one operation, since callers learn
	/// about new revisions only from pulled operations: an empty batch based on
	/// the head is a no-op that returns `base`.
	async fn push_operations(&self, base: Revision, operations: Vec<Operation>) -> Result<Revision, TransportError>;
}
