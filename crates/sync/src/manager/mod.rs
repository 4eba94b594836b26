//! Optimistic document state reconciled against a shared log.
//!
//! The manager keeps two snapshots. `confirmed` is the document at the last
//! revision the log acknowledged; `optimistic` is `confirmed` with every
//! pending local operation folded in. Readers always see `optimistic`.
//!
//! # Reconciliation
//!
//! [`StateManager::sync`] splits the pending queue at call time into the
//! in-flight prefix it pushes and the tail that local edits append while the
//! transport calls are outstanding:
//!
//! ```text
//! confirmed ── remote ──> head ── rebased.left ──> new confirmed
//!     └─ in_flight ─┘           (in_flight past remote)
//!                └── tail ──> rebased tail (past rebased.right)
//! ```
//!
//! No lock is held across transport I/O. Every commit is computed on copies
//! and swapped in under the lock, so readers observe either the pre-sync or
//! the post-sync state.

#[cfg(test)]
mod tests;

use otter_primitives::{Document, Operation, squash, transform_seq};
use otter_worker::TaskGate;
use parking_lot::Mutex;

use crate::error::SyncError;
use crate::revision::Revision;
use crate::transport::{Snapshot, Transport};

/// Lifecycle phase of a [`StateManager`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ManagerPhase {
	/// No checkout attempted yet.
	#[default]
	Uninitialized,
	/// A checkout is running or the last one failed.
	CheckingOut,
	/// A snapshot is loaded; `add` and `sync` are accepted.
	Ready,
}

/// Result of one successful [`StateManager::sync`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOutcome {
	/// Confirmed revision after the sync.
	pub revision: Revision,
	/// Number of remote operations folded in.
	pub pulled: usize,
	/// Number of local operations committed.
	pub pushed: usize,
}

#[derive(Debug)]
struct Inner<D> {
	phase: ManagerPhase,
	revision: Revision,
	confirmed: D,
	optimistic: D,
	pending: Vec<Operation>,
}

impl<D: Document> Inner<D> {
	fn ensure_ready(&self) -> Result<(), SyncError> {
		match self.phase {
			ManagerPhase::Ready => Ok(()),
			phase => Err(SyncError::NotReady(phase)),
		}
	}
}

/// Owns one document's confirmed snapshot, optimistic snapshot and pending queue.
pub struct StateManager<D: Document, T> {
	transport: T,
	inner: Mutex<Inner<D>>,
	reconcile: TaskGate,
}

impl<D: Document, T: Transport<D>> StateManager<D, T> {
	/// Creates an uninitialized manager over `transport`.
	pub fn new(transport: T) -> Self {
		Self {
			transport,
			inner: Mutex::new(Inner {
				phase: ManagerPhase::Uninitialized,
				revision: Revision::ZERO,
				confirmed: D::default(),
				optimistic: D::default(),
				pending: Vec::new(),
			}),
			reconcile: TaskGate::new(),
		}
	}

	/// Returns the transport this manager talks to.
	pub fn transport(&self) -> &T {
		&self.transport
	}

	/// Loads the authoritative snapshot, replacing local state and dropping pending operations.
	///
	/// On failure the manager stays in [`ManagerPhase::CheckingOut`] and may be retried.
	pub async fn checkout(&self) -> Result<Revision, SyncError> {
		let _guard = self.reconcile.try_enter().ok_or(SyncError::SyncInFlight)?;
		self.inner.lock().phase = ManagerPhase::CheckingOut;

		let Snapshot { document, revision } = self.transport.fetch_snapshot().await.inspect_err(|error| {
			tracing::debug!(%error, "sync.checkout.failed");
		})?;

		let mut inner = self.inner.lock();
		let dropped = inner.pending.len();
		inner.optimistic = document.clone();
		inner.confirmed = document;
		inner.revision = revision;
		inner.pending.clear();
		inner.phase = ManagerPhase::Ready;
		tracing::debug!(%revision, dropped, "sync.checkout");
		Ok(revision)
	}

	/// Folds `ops` into the optimistic snapshot and queues them for the next sync.
	///
	/// All or nothing: when any operation fails to apply, neither the snapshot
	/// nor the queue changes. Empty operations are discarded.
	pub fn add<I>(&self, ops: I) -> Result<(), SyncError>
	where
		I: IntoIterator<Item = Operation>,
	{
		let ops: Vec<Operation> = ops.into_iter().filter(|op| !op.is_empty()).collect();
		let mut inner = self.inner.lock();
		inner.ensure_ready()?;
		inner.optimistic.apply_all(&ops)?;
		tracing::trace!(added = ops.len(), pending = inner.pending.len() + ops.len(), "sync.add");
		inner.pending.extend(ops);
		Ok(())
	}

	/// Pulls remote operations, rebases the pending queue over them and pushes it.
	///
	/// Transport failures leave every piece of local state as it was before
	/// the call. A document error after a successful push commits the
	/// confirmed state and drops the local operations that no longer apply.
	pub async fn sync(&self) -> Result<SyncOutcome, SyncError> {
		let _guard = self.reconcile.try_enter().ok_or(SyncError::SyncInFlight)?;
		let (base, in_flight, mut confirmed) = {
			let inner = self.inner.lock();
			inner.ensure_ready()?;
			(inner.revision, inner.pending.clone(), inner.confirmed.clone())
		};

		let remote = self.transport.pull_operations(base).await?;
		let head = remote.iter().map(|op| op.revision).fold(base, Revision::max);
		let remote: Vec<Operation> = remote.into_iter().map(|op| op.operation).collect();
		tracing::trace!(%base, %head, pulled = remote.len(), "sync.pull");

		let mut rebased = transform_seq(&squash(in_flight.iter().cloned()), &remote);
		rebased.left.retain(|op| !op.is_empty());
		confirmed.apply_all(remote.iter().chain(&rebased.left))?;

		let revision = if rebased.left.is_empty() {
			head
		} else {
			let committed = self.transport.push_operations(head, rebased.left.clone()).await?;
			tracing::trace!(%head, %committed, pushed = rebased.left.len(), "sync.push");
			committed.max(head)
		};

		let mut inner = self.inner.lock();
		let tail = inner.pending.get(in_flight.len()..).map(<[Operation]>::to_vec).unwrap_or_default();
		let mut tail = transform_seq(&tail, &rebased.right).left;
		tail.retain(|op| !op.is_empty());

		let mut optimistic = confirmed.clone();
		let rebase_result = optimistic.apply_all(&tail);
		if rebase_result.is_err() {
			tail.clear();
		}

		inner.revision = inner.revision.max(revision);
		inner.confirmed = confirmed;
		inner.optimistic = optimistic;
		inner.pending = tail;

		let outcome = SyncOutcome {
			revision: inner.revision,
			pulled: remote.len(),
			pushed: rebased.left.len(),
		};
		if let Err(error) = rebase_result {
			tracing::error!(%error, revision = %outcome.revision, "sync.rebase.failed");
			return Err(error.into());
		}
		if outcome.pulled > 0 || outcome.pushed > 0 {
			tracing::debug!(%base, revision = %outcome.revision, pulled = outcome.pulled, pushed = outcome.pushed, "sync.reconciled");
		}
		Ok(outcome)
	}

	/// Returns the optimistic document, pending operations included.
	pub fn get_state(&self) -> D {
		self.inner.lock().optimistic.clone()
	}

	/// Returns the last revision the log confirmed.
	pub fn get_revision(&self) -> Revision {
		self.inner.lock().revision
	}

	/// Returns the optimistic document and confirmed revision read together.
	pub fn view(&self) -> (D, Revision) {
		let inner = self.inner.lock();
		(inner.optimistic.clone(), inner.revision)
	}

	/// Returns the lifecycle phase.
	pub fn phase(&self) -> ManagerPhase {
		self.inner.lock().phase
	}

	/// Returns the number of unconfirmed local operations.
	pub fn pending_len(&self) -> usize {
		self.inner.lock().pending.len()
	}

	/// Returns true while a checkout or sync is running.
	pub fn is_reconciling(&self) -> bool {
		self.reconcile.is_busy()
	}
}
