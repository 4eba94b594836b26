//! Shared in-process revision log.
//!
//! Every clone of a [`MemoryLog`] addresses the same log, so several managers
//! built on clones behave like actors writing to one server. Commits are
//! validated against the head document and rejected when they are based on a
//! stale revision or do not apply.

mod graph;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
pub use graph::{CommitGraph, GraphNode};
use otter_primitives::{Document, Operation};
use parking_lot::Mutex;

use crate::error::TransportError;
use crate::revision::Revision;
use crate::transport::{RemoteOperation, Snapshot, Transport};

/// One accepted push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
	/// Revision the commit produced.
	pub revision: Revision,
	/// Revision the commit was based on.
	pub parent: Revision,
	/// Operations in application order.
	pub operations: Vec<Operation>,
}

/// Transport and graph calls served by a [`MemoryLog`], successful or not.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogCalls {
	/// `fetch_snapshot` calls.
	pub snapshots: u64,
	/// `pull_operations` calls.
	pub pulls: u64,
	/// `push_operations` calls.
	pub pushes: u64,
	/// Graph reads.
	pub graphs: u64,
}

#[derive(Debug)]
struct LogState<D> {
	initial: D,
	head: D,
	commits: Vec<Commit>,
	failures: u32,
	graph_failures: u32,
	closed: bool,
	latency: Duration,
	graph_latency: Duration,
}

impl<D: Document> LogState<D> {
	fn revision(&self) -> Revision {
		self.commits.last().map_or(Revision::ZERO, |commit| commit.revision)
	}

	fn check_fault(&mut self) -> Result<(), TransportError> {
		if self.closed {
			return Err(TransportError::Closed);
		}
		if self.failures > 0 {
			self.failures -= 1;
			return Err(TransportError::Unavailable("injected failure".to_string()));
		}
		Ok(())
	}

	fn check_graph_fault(&mut self) -> Result<(), TransportError> {
		if self.closed {
			return Err(TransportError::Closed);
		}
		if self.graph_failures > 0 {
			self.graph_failures -= 1;
			return Err(TransportError::Unavailable("injected graph failure".to_string()));
		}
		Ok(())
	}

	/// An empty batch creates no revision: pulls could not reveal it.
	fn append(&mut self, base: Revision, operations: Vec<Operation>) -> Result<Revision, TransportError> {
		let head = self.revision();
		if base != head {
			return Err(TransportError::Conflict { base, head });
		}
		if operations.is_empty() {
			return Ok(head);
		}
		self.head
			.apply_all(&operations)
			.map_err(|error| TransportError::Rejected(error.to_string()))?;
		let revision = head.next();
		self.commits.push(Commit {
			revision,
			parent: head,
			operations,
		});
		Ok(revision)
	}
}

#[derive(Debug, Default)]
struct Counters {
	snapshots: AtomicU64,
	pulls: AtomicU64,
	pushes: AtomicU64,
	graphs: AtomicU64,
}

#[derive(Debug)]
struct Shared<D> {
	state: Mutex<LogState<D>>,
	calls: Counters,
}

/// Cloneable handle to a shared commit log.
#[derive(Debug)]
pub struct MemoryLog<D> {
	shared: Arc<Shared<D>>,
}

impl<D> Clone for MemoryLog<D> {
	fn clone(&self) -> Self {
		Self {
			shared: Arc::clone(&self.shared),
		}
	}
}

impl<D: Document> Default for MemoryLog<D> {
	fn default() -> Self {
		Self::new(D::default())
	}
}

impl<D: Document> MemoryLog<D> {
	/// Creates a log whose revision zero is `initial`.
	pub fn new(initial: D) -> Self {
		Self {
			shared: Arc::new(Shared {
				state: Mutex::new(LogState {
					head: initial.clone(),
					initial,
					commits: Vec::new(),
					failures: 0,
					graph_failures: 0,
					closed: false,
					latency: Duration::ZERO,
					graph_latency: Duration::ZERO,
				}),
				calls: Counters::default(),
			}),
		}
	}

	/// Returns the head revision.
	pub fn revision(&self) -> Revision {
		self.shared.state.lock().revision()
	}

	/// Returns the head document.
	pub fn head(&self) -> D {
		self.shared.state.lock().head.clone()
	}

	/// Returns every commit in order.
	pub fn commits(&self) -> Vec<Commit> {
		self.shared.state.lock().commits.clone()
	}

	/// Commits `operations` on top of the current head, bypassing faults and latency.
	pub fn commit(&self, operations: impl IntoIterator<Item = Operation>) -> Result<Revision, TransportError> {
		let mut state = self.shared.state.lock();
		let head = state.revision();
		state.append(head, operations.into_iter().collect())
	}

	/// Makes the next `count` transport calls fail with [`TransportError::Unavailable`].
	///
	/// Graph reads are not transport calls and leave the count alone.
	pub fn fail_next(&self, count: u32) {
		self.shared.state.lock().failures = count;
	}

	/// Makes the next `count` graph reads fail with [`TransportError::Unavailable`].
	pub fn fail_next_graph(&self, count: u32) {
		self.shared.state.lock().graph_failures = count;
	}

	/// Fails every later call with [`TransportError::Closed`].
	pub fn close(&self) {
		self.shared.state.lock().closed = true;
	}

	/// Delays every transport call by `latency`.
	pub fn set_latency(&self, latency: Duration) {
		self.shared.state.lock().latency = latency;
	}

	/// Delays every graph read by `latency`.
	pub fn set_graph_latency(&self, latency: Duration) {
		self.shared.state.lock().graph_latency = latency;
	}

	/// Returns call counters.
	pub fn calls(&self) -> LogCalls {
		let calls = &self.shared.calls;
		LogCalls {
			snapshots: calls.snapshots.load(Ordering::Acquire),
			pulls: calls.pulls.load(Ordering::Acquire),
			pushes: calls.pushes.load(Ordering::Acquire),
			graphs: calls.graphs.load(Ordering::Acquire),
		}
	}

	/// Returns the commit graph up to and including `revision`.
	pub fn commit_graph(&self, revision: Revision) -> CommitGraph {
		let state = self.shared.state.lock();
		CommitGraph::from_commits(state.commits.iter().take_while(|commit| commit.revision <= revision), revision)
	}

	/// Reads the commit graph at `revision` as a remote reader would.
	pub async fn read_graph(&self, revision: Revision) -> Result<CommitGraph, TransportError> {
		self.shared.calls.graphs.fetch_add(1, Ordering::AcqRel);
		let latency = self.shared.state.lock().graph_latency;
		tokio::time::sleep(latency).await;
		self.shared.state.lock().check_graph_fault()?;
		Ok(self.commit_graph(revision))
	}

	/// Returns the document at revision zero.
	pub fn initial(&self) -> D {
		self.shared.state.lock().initial.clone()
	}

	async fn delay(&self) -> Result<(), TransportError> {
		let latency = self.shared.state.lock().latency;
		tokio::time::sleep(latency).await;
		self.shared.state.lock().check_fault()
	}
}

#[async_trait]
impl<D: Document> Transport<D> for MemoryLog<D> {
	async fn fetch_snapshot(&self) -> Result<Snapshot<D>, TransportError> {
		self.shared.calls.snapshots.fetch_add(1, Ordering::AcqRel);
		self.delay().await?;
		let state = self.shared.state.lock();
		Ok(Snapshot {
			document: state.head.clone(),
			revision: state.revision(),
		})
	}

	async fn pull_operations(&self, since: Revision) -> Result<Vec<RemoteOperation>, TransportError> {
		self.shared.calls.pulls.fetch_add(1, Ordering::AcqRel);
		self.delay().await?;
		let state = self.shared.state.lock();
		Ok(state
			.commits
			.iter()
			.filter(|commit| commit.revision > since)
			.flat_map(|commit| {
				commit.operations.iter().map(|operation| RemoteOperation {
					operation: operation.clone(),
					revision: commit.revision,
				})
			})
			.collect())
	}

	async fn push_operations(&self, base: Revision, operations: Vec<Operation>) -> Result<Revision, TransportError> {
		self.shared.calls.pushes.fetch_add(1, Ordering::AcqRel);
		self.delay().await?;
		let revision = self.shared.state.lock().append(base, operations);
		match &revision {
			Ok(revision) => tracing::trace!(%base, %revision, "log.commit"),
			Err(error) => tracing::debug!(%base, %error, "log.commit.rejected"),
		}
		revision
	}
}
