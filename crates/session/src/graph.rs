use std::fmt;

use async_trait::async_trait;
use otter_primitives::Document;
use otter_sync::{CommitGraph, MemoryLog, Revision, TransportError};

/// Reads the revision graph a session republishes after each sync.
#[async_trait]
pub trait GraphReader: Send + Sync + 'static {
	/// Graph snapshot; opaque to the session.
	type Graph: Clone + fmt::Debug + Send + Sync + 'static;

	/// Reads the graph as of `revision`.
	async fn get_graph(&self, revision: Revision) -> Result<Self::Graph, TransportError>;
}

/// Graph reader for sessions that do not display history.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGraph;

#[async_trait]
impl GraphReader for NoGraph {
	type Graph = ();

	async fn get_graph(&self, _revision: Revision) -> Result<(), TransportError> {
		Ok(())
	}
}

#[async_trait]
impl<D: Document> GraphReader for MemoryLog<D> {
	type Graph = CommitGraph;

	async fn get_graph(&self, revision: Revision) -> Result<CommitGraph, TransportError> {
		self.read_graph(revision).await
	}
}
