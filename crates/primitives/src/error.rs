use thiserror::Error;

use crate::range::{CharIdx, CharLen};

/// Failure applying an [`Operation`](crate::Operation) to a document.
///
/// Every variant signals a document-integrity problem. None of them is
/// transient, so callers must surface them rather than retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OtError {
	/// The operation addresses characters beyond the end of the document.
	#[error("position {position} is out of range for a document of {len} characters")]
	OutOfRange {
		/// First character the operation touches.
		position: CharIdx,
		/// Length of the document it was applied to.
		len: CharLen,
	},
	/// A deletion expected different characters than the document holds.
	#[error("content mismatch at {position}: expected {expected:?}, found {found:?}")]
	ContentMismatch {
		/// Start of the deleted range.
		position: CharIdx,
		/// Characters the deletion carries.
		expected: String,
		/// Characters actually present.
		found: String,
	},
	/// The operation kind has no meaning for this document kind.
	#[error("{op} operation cannot be applied to a {document} document")]
	Unsupported {
		/// Operation kind name.
		op: &'static str,
		/// Document kind name.
		document: &'static str,
	},
}
