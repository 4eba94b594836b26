use std::fmt::Write as _;

use super::Commit;
use crate::revision::Revision;

/// A revision in a [`CommitGraph`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphNode {
	/// Revision the node stands for.
	pub revision: Revision,
	/// Revision it was committed on top of; `None` for the root.
	pub parent: Option<Revision>,
	/// Number of operations in the commit.
	pub operations: usize,
}

/// Revision history of a log as seen at one revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitGraph {
	/// Revision the graph was read at.
	pub head: Revision,
	/// Nodes in revision order, root first.
	pub nodes: Vec<GraphNode>,
}

impl CommitGraph {
	pub(crate) fn from_commits<'a>(commits: impl IntoIterator<Item = &'a Commit>, head: Revision) -> Self {
		let root = GraphNode {
			revision: Revision::ZERO,
			parent: None,
			operations: 0,
		};
		let nodes = std::iter::once(root)
			.chain(commits.into_iter().map(|commit| GraphNode {
				revision: commit.revision,
				parent: Some(commit.parent),
				operations: commit.operations.len(),
			}))
			.collect();
		Self { head, nodes }
	}

	/// Returns the number of commits, excluding the root.
	pub fn len(&self) -> usize {
		self.nodes.len().saturating_sub(1)
	}

	/// Returns true when nothing was committed.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Renders the graph in Graphviz `dot` syntax.
	pub fn to_dot(&self) -> String {
		let mut out = String::from("digraph commits {\n\trankdir=LR;\n");
		for node in &self.nodes {
			let shape = if node.revision == self.head { "doublecircle" } else { "circle" };
			let _ = writeln!(out, "\t\"{}\" [shape={shape}, label=\"{}\\n{} ops\"];", node.revision, node.revision, node.operations);
		}
		for node in &self.nodes {
			if let Some(parent) = node.parent {
				let _ = writeln!(out, "\t\"{parent}\" -> \"{}\";", node.revision);
			}
		}
		out.push_str("}\n");
		out
	}
}
