mod chat;
mod text;


use std::fmt;

pub use chat::{ChatDocument, canonical_key};
pub use text::TextDocument;

use crate::error::OtError;
use crate::operation::Operation;

/// A materialized value that operations fold into.
///
/// `apply` must leave the document untouched when it fails, and must treat
/// empty operations as no-ops regardless of their position.
pub trait Document: Clone + Default + fmt::Debug + PartialEq + Send + Sync + 'static {
	/// Kind name used in diagnostics.
	const KIND: &'static str;

	/// Applies one operation in place.
	fn apply(&mut self, op: &Operation) -> Result<(), OtError>;

	/// Applies `ops` in order, all or nothing.
	fn apply_all<'a, I>(&mut self, ops: I) -> Result<(), OtError>
	where
		I: IntoIterator<Item = &'a Operation>,
	{
		let mut next = self.clone();
		for op in ops {
			next.apply(op)?;
		}
		*self = next;
		Ok(())
	}
}
