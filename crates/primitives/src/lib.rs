//! Operation algebra for OT-synchronized documents: operations, documents, transform and compose.

/// Composition and squashing of sequential operations.
pub mod compose;
/// Document types operations fold into.
pub mod document;
/// Errors raised while applying operations.
pub mod error;
/// The closed operation type and chat messages.
pub mod operation;
/// Character index aliases.
pub mod range;
/// Concurrent operation transformation.
pub mod transform;

pub use compose::{compose, invert_seq, squash};
pub use document::{ChatDocument, Document, TextDocument, canonical_key};
pub use error::OtError;
pub use operation::{ChatMessage, Operation};
pub use range::{CharIdx, CharLen};
pub use ropey::Rope;
pub use transform::{TransformResult, transform, transform_seq};
